//! Unified error handling for the client.

/// Failure to obtain a snapshot from a record source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed responded with status {0}")]
    Status(u16),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a fetch-and-reconcile cycle.
///
/// The view is left untouched whenever one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Failure to load or store the view cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache contents invalid: {0}")]
    Engine(#[from] feedsync_engine::Error),
}

/// Result type alias for sync cycles.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::from(FetchError::Status(503));
        assert_eq!(
            err.to_string(),
            "Fetch failed: Feed responded with status 503"
        );

        let err = CacheError::from(feedsync_engine::Error::UnorderedSnapshot { index: 2 });
        assert_eq!(
            err.to_string(),
            "Cache contents invalid: snapshot records out of order at index 2"
        );
    }
}
