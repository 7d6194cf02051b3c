//! Snapshot types for persisting and restoring a view.
//!
//! A snapshot stores the view's records in display order, so restoring one
//! needs no re-sorting, only a check that the order still holds.

use crate::{error::Result, Error, MergePolicy, Record};
use serde::{Deserialize, Serialize};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time copy of an [`OrderedSyncView`](crate::OrderedSyncView).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Merge policy of the exported view
    #[serde(default)]
    pub policy: MergePolicy,
    /// Records, newest first
    pub records: Vec<Record>,
}

impl ViewSnapshot {
    /// Create a snapshot at the current format version.
    pub fn new(policy: MergePolicy, records: Vec<Record>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            policy,
            records,
        }
    }

    /// Number of records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Timestamp of the newest record, if any.
    pub fn watermark(&self) -> Option<crate::Timestamp> {
        self.records.first().map(|r| r.timestamp)
    }

    pub(crate) fn check_format(&self) -> Result<()> {
        if self.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                self.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        snapshot.check_format()?;
        Ok(snapshot)
    }
}
