//! On-disk cache of the view.
//!
//! Lets a restarted client show the last known feed before its first fetch
//! completes. The file holds a [`ViewSnapshot`] as JSON.

use crate::error::CacheError;
use feedsync_engine::{OrderedSyncView, ViewSnapshot};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// JSON snapshot file for one view.
#[derive(Debug, Clone)]
pub struct ViewCache {
    path: PathBuf,
}

impl ViewCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached view, or `None` if nothing has been cached yet.
    pub async fn load(&self) -> Result<Option<OrderedSyncView>, CacheError> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot = ViewSnapshot::from_json(&json)?;
        Ok(Some(OrderedSyncView::from_snapshot(snapshot)?))
    }

    /// Replace the cached view.
    ///
    /// Writes a sibling `.tmp` file, then renames it over the cache.
    pub async fn save(&self, view: &OrderedSyncView) -> Result<(), CacheError> {
        let json = view.export_snapshot().to_json()?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        Ok(())
    }
}
