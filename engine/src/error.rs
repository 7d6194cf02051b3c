//! Error types for the feedsync engine.

use crate::RecordId;
use thiserror::Error;

/// All possible errors from the feedsync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Record errors
    #[error("record has no timestamp: {}", .id.as_deref().unwrap_or("<no id>"))]
    MissingTimestamp { id: Option<RecordId> },

    // Snapshot errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("snapshot records out of order at index {index}")]
    UnorderedSnapshot { index: usize },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::MissingTimestamp {
            id: Some("photo-1".into()),
        };
        assert_eq!(err.to_string(), "record has no timestamp: photo-1");

        let err = Error::MissingTimestamp { id: None };
        assert_eq!(err.to_string(), "record has no timestamp: <no id>");

        let err = Error::UnorderedSnapshot { index: 3 };
        assert_eq!(err.to_string(), "snapshot records out of order at index 3");
    }
}
