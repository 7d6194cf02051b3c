//! Record types carried through the view.

use crate::{error::Result, Error, RecordId, Timestamp};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A remote-origin item held by the view.
///
/// The timestamp is both the sort key and, under the default merge policy,
/// the de-duplication key. The payload is never inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Stable identity, when the producer assigns one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Producer-assigned ordering key
    pub timestamp: Timestamp,
    /// Opaque associated data (caption, tags, display handle, ...)
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Record {
    /// Create a record without an identity.
    pub fn new(timestamp: Timestamp, payload: serde_json::Value) -> Self {
        Self {
            id: None,
            timestamp,
            payload,
        }
    }

    /// Create a record with an identity.
    pub fn with_id(
        id: impl Into<RecordId>,
        timestamp: Timestamp,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Some(id.into()),
            timestamp,
            payload,
        }
    }

    /// Key used for identity-based de-duplication.
    ///
    /// Falls back to the timestamp when the record has no id.
    pub fn key(&self) -> RecordKey {
        match &self.id {
            Some(id) => RecordKey::Id(id.clone()),
            None => RecordKey::Timestamp(self.timestamp),
        }
    }
}

/// Identity of a record for de-duplication purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Id(RecordId),
    Timestamp(Timestamp),
}

/// A batch entry as delivered by a record source.
///
/// Unlike [`Record`], the timestamp may be missing. Such entries are
/// rejected individually during reconciliation. Deserialization never fails
/// on a field value: a timestamp that is not an unsigned integer reads as
/// missing, and an id that is neither a string nor a number is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_id"
    )]
    pub id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_u64()))
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<RecordId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

/// Deserialize a batch entry by entry.
///
/// An entry that is not a record object becomes a [`RemoteRecord`] without a
/// timestamp carrying the raw value as payload, so it is counted as
/// malformed instead of rejecting the whole batch. Usable as a serde
/// `deserialize_with` function.
pub fn deserialize_batch<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<RemoteRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values.into_iter().map(RemoteRecord::from_value).collect())
}

impl RemoteRecord {
    /// Read one batch entry from an arbitrary JSON value.
    pub fn from_value(value: Value) -> Self {
        if value.is_object() {
            if let Ok(record) = serde_json::from_value(value.clone()) {
                return record;
            }
        }
        Self {
            id: None,
            timestamp: None,
            payload: value,
        }
    }

    /// Validate into a [`Record`].
    pub fn into_record(self) -> Result<Record> {
        match self.timestamp {
            Some(timestamp) => Ok(Record {
                id: self.id,
                timestamp,
                payload: self.payload,
            }),
            None => Err(Error::MissingTimestamp { id: self.id }),
        }
    }
}

impl From<Record> for RemoteRecord {
    fn from(record: Record) -> Self {
        Self {
            id: record.id,
            timestamp: Some(record.timestamp),
            payload: record.payload,
        }
    }
}
