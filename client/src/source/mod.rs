//! Record sources.
//!
//! A source returns the complete set of records it currently knows about on
//! every call. It never sends deltas; working out what is new is the view's
//! job.

mod http;

pub use http::{FeedResponse, HttpRecordSource};

use crate::auth::Session;
use crate::error::FetchError;
use feedsync_engine::RemoteRecord;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Source of full record snapshots.
pub trait RecordSource: Send + Sync {
    /// Fetch every record the remote store currently holds.
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<RemoteRecord>, FetchError>>;

    /// Install credentials for subsequent fetches.
    ///
    /// Sources without access control ignore this.
    fn authorize(&self, _session: &Session) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

impl<S: RecordSource + ?Sized> RecordSource for Arc<S> {
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<RemoteRecord>, FetchError>> {
        (**self).fetch_all()
    }

    fn authorize(&self, session: &Session) -> BoxFuture<'_, ()> {
        (**self).authorize(session)
    }
}
