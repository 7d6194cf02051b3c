//! OrderedSyncView - the newest-first record container.
//!
//! The view owns its records exclusively. The only mutation is
//! [`OrderedSyncView::reconcile`], which keeps the sequence sorted descending
//! by timestamp and never moves a record relative to the ones already there.

use crate::{
    error::Result, reconcile::Reconciler, Error, MergePolicy, Record, RecordKey, ReconcileResult,
    RemoteRecord, Timestamp, ViewSnapshot,
};
use std::collections::{vec_deque, HashSet, VecDeque};

/// Client-side ordered view of a remote record store.
#[derive(Debug, Clone, Default)]
pub struct OrderedSyncView {
    /// Records, index 0 is the newest
    records: VecDeque<Record>,
    /// Keys of every record in `records`
    keys: HashSet<RecordKey>,
    /// How incoming batches are matched against the view
    policy: MergePolicy,
}

impl OrderedSyncView {
    /// Create an empty view with the watermark policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty view with the given merge policy.
    pub fn with_policy(policy: MergePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Get the merge policy.
    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Fold a full snapshot from the record source into the view.
    ///
    /// The batch may be unsorted and may repeat records already displayed.
    /// Entries without a timestamp are skipped and counted in the result.
    pub fn reconcile<I, R>(&mut self, batch: I) -> ReconcileResult
    where
        I: IntoIterator<Item = R>,
        R: Into<RemoteRecord>,
    {
        Reconciler::new(&mut self.records, &mut self.keys, self.policy)
            .reconcile(batch.into_iter().map(Into::into))
    }

    /// Timestamp of the newest record, if any.
    pub fn watermark(&self) -> Option<Timestamp> {
        self.records.front().map(|r| r.timestamp)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the view has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get the record at `index` (0 is the newest).
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Get the newest record.
    pub fn front(&self) -> Option<&Record> {
        self.records.front()
    }

    /// Iterate newest first.
    pub fn iter(&self) -> vec_deque::Iter<'_, Record> {
        self.records.iter()
    }

    /// Copy the records out, newest first.
    pub fn to_vec(&self) -> Vec<Record> {
        self.records.iter().cloned().collect()
    }

    /// Check if a record with this key is in the view.
    pub fn contains_key(&self, key: &RecordKey) -> bool {
        self.keys.contains(key)
    }

    /// Export the view as a snapshot.
    pub fn export_snapshot(&self) -> ViewSnapshot {
        ViewSnapshot::new(self.policy, self.to_vec())
    }

    /// Restore a view from a snapshot.
    ///
    /// Fails if the records are not sorted newest first.
    pub fn from_snapshot(snapshot: ViewSnapshot) -> Result<Self> {
        snapshot.check_format()?;

        if let Some(index) = snapshot
            .records
            .windows(2)
            .position(|pair| pair[0].timestamp < pair[1].timestamp)
        {
            return Err(Error::UnorderedSnapshot { index: index + 1 });
        }

        let keys = snapshot.records.iter().map(Record::key).collect();
        Ok(Self {
            records: snapshot.records.into(),
            keys,
            policy: snapshot.policy,
        })
    }
}

impl<'a> IntoIterator for &'a OrderedSyncView {
    type Item = &'a Record;
    type IntoIter = vec_deque::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
