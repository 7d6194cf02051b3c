//! Reconciliation of a fetched snapshot into the ordered view.
//!
//! A record source returns its full known state on every fetch. This module
//! folds such a snapshot into the newest-first view without reordering or
//! duplicating what is already displayed.
//!
//! # Algorithm
//!
//! 1. Drop malformed entries (no timestamp), counting them
//! 2. Empty view: sort the batch newest first and append it (initial load)
//! 3. Otherwise select the unseen records according to the [`MergePolicy`]
//! 4. Insert the selection so the view stays sorted descending by timestamp
//!
//! The initial load keeps every distinct record and drops only exact
//! repeats. An incremental call inserts each dedup key at most once: the
//! timestamp under [`MergePolicy::Watermark`], the [`RecordKey`] under
//! [`MergePolicy::Identity`].

use crate::{Record, RecordKey, RemoteRecord, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// How incoming records are matched against records already in the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergePolicy {
    /// Only records strictly newer than the front of the view are taken.
    /// Anything at or below the watermark is assumed to be present already.
    #[default]
    Watermark,
    /// Records are matched by [`RecordKey`]. Unknown records older than the
    /// watermark are inserted at their sorted position.
    Identity,
}

/// Which branch of the algorithm a call took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconcileMode {
    /// The view was empty and the whole batch was loaded
    InitialLoad,
    /// The view was populated and only unseen records were merged
    Incremental,
}

/// Summary of a single reconcile call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    /// Branch taken
    pub mode: ReconcileMode,
    /// Records added to the view
    pub inserted: usize,
    /// Records assumed to be present already
    pub ignored: usize,
    /// Repeats within the same batch that were not inserted
    pub duplicates: usize,
    /// Entries rejected for missing a timestamp
    pub malformed: usize,
    /// Front timestamp before the call
    pub watermark_before: Option<Timestamp>,
    /// Front timestamp after the call
    pub watermark_after: Option<Timestamp>,
}

impl ReconcileResult {
    fn new(mode: ReconcileMode, watermark_before: Option<Timestamp>) -> Self {
        Self {
            mode,
            inserted: 0,
            ignored: 0,
            duplicates: 0,
            malformed: 0,
            watermark_before,
            watermark_after: watermark_before,
        }
    }

    /// Whether the view was mutated.
    pub fn changed(&self) -> bool {
        self.inserted > 0
    }
}

/// Applies one batch to the storage of a view.
pub(crate) struct Reconciler<'a> {
    records: &'a mut VecDeque<Record>,
    keys: &'a mut HashSet<RecordKey>,
    policy: MergePolicy,
}

impl<'a> Reconciler<'a> {
    pub(crate) fn new(
        records: &'a mut VecDeque<Record>,
        keys: &'a mut HashSet<RecordKey>,
        policy: MergePolicy,
    ) -> Self {
        Self {
            records,
            keys,
            policy,
        }
    }

    pub(crate) fn reconcile(
        self,
        batch: impl IntoIterator<Item = RemoteRecord>,
    ) -> ReconcileResult {
        let watermark = self.records.front().map(|r| r.timestamp);
        let mode = if watermark.is_none() {
            ReconcileMode::InitialLoad
        } else {
            ReconcileMode::Incremental
        };
        let mut result = ReconcileResult::new(mode, watermark);

        let mut valid = Vec::new();
        for remote in batch {
            match remote.into_record() {
                Ok(record) => valid.push(record),
                Err(_) => result.malformed += 1,
            }
        }

        match (watermark, self.policy) {
            (None, _) => self.load(valid, &mut result),
            (Some(latest), MergePolicy::Watermark) => {
                self.merge_above(latest, valid, &mut result)
            }
            (Some(_), MergePolicy::Identity) => self.merge_by_identity(valid, &mut result),
        }

        result
    }

    fn load(self, batch: Vec<Record>, result: &mut ReconcileResult) {
        let mut selected = drop_exact_repeats(batch, result);
        sort_newest_first(&mut selected);

        self.records.reserve(selected.len());
        for record in selected {
            self.keys.insert(record.key());
            self.records.push_back(record);
            result.inserted += 1;
        }
        result.watermark_after = self.records.front().map(|r| r.timestamp);
    }

    fn merge_above(self, latest: Timestamp, batch: Vec<Record>, result: &mut ReconcileResult) {
        let (newer, stale): (Vec<_>, Vec<_>) =
            batch.into_iter().partition(|r| r.timestamp > latest);
        result.ignored += stale.len();

        let mut selected = take_unique(newer, |r| RecordKey::Timestamp(r.timestamp), result);
        sort_newest_first(&mut selected);

        // Oldest first at the front, so the block ends up newest first.
        for record in selected.into_iter().rev() {
            self.keys.insert(record.key());
            self.records.push_front(record);
            result.inserted += 1;
        }
        result.watermark_after = self.records.front().map(|r| r.timestamp);
    }

    fn merge_by_identity(self, batch: Vec<Record>, result: &mut ReconcileResult) {
        let (known, unknown): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .partition(|r| self.keys.contains(&r.key()));
        result.ignored += known.len();

        let mut selected = take_unique(unknown, Record::key, result);
        sort_newest_first(&mut selected);

        for record in selected {
            // After every record with an equal or newer timestamp.
            let at = self
                .records
                .partition_point(|existing| existing.timestamp >= record.timestamp);
            self.keys.insert(record.key());
            self.records.insert(at, record);
            result.inserted += 1;
        }
        result.watermark_after = self.records.front().map(|r| r.timestamp);
    }
}

/// Keep the first occurrence of every key, counting the rest.
fn take_unique(
    batch: Vec<Record>,
    key: impl Fn(&Record) -> RecordKey,
    result: &mut ReconcileResult,
) -> Vec<Record> {
    let mut seen = HashSet::with_capacity(batch.len());
    let mut unique = Vec::with_capacity(batch.len());
    for record in batch {
        if seen.insert(key(&record)) {
            unique.push(record);
        } else {
            result.duplicates += 1;
        }
    }
    unique
}

/// Drop records identical to an earlier one, counting them.
///
/// Distinct records sharing a key are all kept.
fn drop_exact_repeats(batch: Vec<Record>, result: &mut ReconcileResult) -> Vec<Record> {
    let mut by_key: HashMap<RecordKey, Vec<usize>> = HashMap::with_capacity(batch.len());
    let mut unique: Vec<Record> = Vec::with_capacity(batch.len());
    for record in batch {
        let kept = by_key.entry(record.key()).or_default();
        if kept.iter().any(|&i| unique[i] == record) {
            result.duplicates += 1;
            continue;
        }
        kept.push(unique.len());
        unique.push(record);
    }
    unique
}

/// Stable: equal timestamps keep batch order.
fn sort_newest_first(records: &mut [Record]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
