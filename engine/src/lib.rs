//! # feedsync Engine
//!
//! An ordered-merge view engine for feed-style clients.
//!
//! A remote store hands out its full set of records on every fetch. This
//! crate keeps a client-side, newest-first view of those records and folds
//! each fetched snapshot into it without reordering or duplicating entries
//! that are already displayed.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of files, network, or platform
//! - **Deterministic**: Same view and batch always produce the same view
//! - **Single writer**: The view is mutated only through `reconcile`
//! - **Portable**: Runs anywhere Rust runs, and over a C ABI
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] carries an optional id, an integer timestamp and an opaque
//! JSON payload. Sources deliver [`RemoteRecord`]s, whose timestamp may be
//! missing; such entries are skipped rather than failing the whole batch.
//!
//! ### The View
//!
//! [`OrderedSyncView`] holds records sorted descending by timestamp. The
//! timestamp of its front record is the *watermark*.
//!
//! ### Reconciliation
//!
//! [`OrderedSyncView::reconcile`] merges a batch according to a
//! [`MergePolicy`]:
//! - [`MergePolicy::Watermark`] - take only records newer than the watermark (default)
//! - [`MergePolicy::Identity`] - take every record whose key is not in the view
//!
//! ## Quick Start
//!
//! ```rust
//! use feedsync_engine::{OrderedSyncView, Record};
//! use serde_json::json;
//!
//! let mut view = OrderedSyncView::new();
//!
//! // First fetch: the whole batch is loaded, newest first
//! let batch = [5, 1, 9, 3].map(|ts| Record::new(ts, json!({"caption": "photo"})));
//! view.reconcile(batch.clone());
//! assert_eq!(view.watermark(), Some(9));
//!
//! // Later fetch: the source returns everything again, plus new records
//! let mut batch = batch.to_vec();
//! batch.push(Record::new(12, json!({"caption": "new"})));
//! let result = view.reconcile(batch);
//!
//! assert_eq!(result.inserted, 1);
//! let order: Vec<_> = view.iter().map(|r| r.timestamp).collect();
//! assert_eq!(order, vec![12, 9, 5, 3, 1]);
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module provides C-compatible functions for hosting a view from
//! other languages (Dart/Flutter, Swift, Kotlin, etc.). All data is exchanged
//! as JSON strings.
//!
//! ## Persistence
//!
//! Use [`OrderedSyncView::export_snapshot`] and
//! [`OrderedSyncView::from_snapshot`] with [`ViewSnapshot`] to persist a view.

pub mod error;
pub mod ffi;
pub mod reconcile;
pub mod record;
pub mod snapshot;
pub mod view;

// Re-export main types at crate root
pub use error::Error;
pub use reconcile::{MergePolicy, ReconcileMode, ReconcileResult};
pub use record::{Record, RecordKey, RemoteRecord};
pub use snapshot::{ViewSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use view::OrderedSyncView;

/// Type aliases for clarity
pub type RecordId = String;
pub type Timestamp = u64;
