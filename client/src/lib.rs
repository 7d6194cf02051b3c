//! feedsync Client - keeps an ordered record feed in sync with a remote store.
//!
//! Wraps the `feedsync-engine` view in an async pipeline: triggers (manual
//! refreshes, a timer, a completed login) cause a full snapshot to be fetched
//! from a [`RecordSource`](source::RecordSource) and merged into the view,
//! one refresh at a time. Subscribers are notified whenever the view changes.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod render;
pub mod source;
pub mod sync;
