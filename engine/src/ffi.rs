//! FFI layer for mobile shells.
//!
//! This module provides C-compatible functions that can be called via Dart
//! FFI, Swift or Kotlin/JNI. All data crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `feedsync_*` functions are allocated by Rust
//! - Caller must free them with `feedsync_string_free`
//! - View pointers must be freed with `feedsync_view_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::{MergePolicy, OrderedSyncView, RemoteRecord, ViewSnapshot};
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `feedsync_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => c"{\"error\":\"string contained null bytes\"}"
            .to_owned()
            .into_raw(),
    }
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn merge_policy(policy: i32) -> MergePolicy {
    if policy == 1 {
        MergePolicy::Identity
    } else {
        MergePolicy::Watermark
    }
}

// ============================================================================
// View Lifecycle
// ============================================================================

/// Create a new, empty view.
///
/// # Arguments
/// - `policy`: 0 for Watermark (default), 1 for Identity
///
/// # Returns
/// Pointer to the view. Free with `feedsync_view_free`.
#[no_mangle]
pub extern "C" fn feedsync_view_new(policy: i32) -> *mut OrderedSyncView {
    Box::into_raw(Box::new(OrderedSyncView::with_policy(merge_policy(policy))))
}

/// Restore a view from a snapshot.
///
/// # Arguments
/// - `snapshot_json`: JSON string of ViewSnapshot
///
/// # Returns
/// Pointer to the view, or null if the snapshot is invalid.
///
/// # Safety
/// - `snapshot_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `feedsync_view_free`
#[no_mangle]
pub unsafe extern "C" fn feedsync_view_import(
    snapshot_json: *const c_char,
) -> *mut OrderedSyncView {
    let snapshot_str = match from_c_string(snapshot_json) {
        Some(s) => s,
        None => return ptr::null_mut(),
    };

    let view = ViewSnapshot::from_json(&snapshot_str).and_then(OrderedSyncView::from_snapshot);
    match view {
        Ok(view) => Box::into_raw(Box::new(view)),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a view.
///
/// # Safety
/// - `view` must be a valid pointer from `feedsync_view_new` or `feedsync_view_import`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn feedsync_view_free(view: *mut OrderedSyncView) {
    if !view.is_null() {
        drop(Box::from_raw(view));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `feedsync_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn feedsync_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Merge a fetched batch into the view.
///
/// # Arguments
/// - `batch_json`: JSON array of records (`{"id"?, "timestamp"?, "payload"?}`)
///
/// # Returns
/// JSON string: `{"ok": ReconcileResult}` or `{"error": "message"}`
///
/// # Safety
/// - `view` must be a valid view pointer or null
/// - `batch_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `feedsync_string_free`
#[no_mangle]
pub unsafe extern "C" fn feedsync_view_reconcile(
    view: *mut OrderedSyncView,
    batch_json: *const c_char,
) -> *mut c_char {
    let view = match view.as_mut() {
        Some(v) => v,
        None => return to_c_string(FfiResult::<()>::err("null view pointer").to_json()),
    };

    let batch_str = match from_c_string(batch_json) {
        Some(s) => s,
        None => return to_c_string(FfiResult::<()>::err("invalid batch JSON").to_json()),
    };

    let entries: Vec<serde_json::Value> = match serde_json::from_str(&batch_str) {
        Ok(b) => b,
        Err(e) => {
            return to_c_string(FfiResult::<()>::err(format!("parse error: {}", e)).to_json())
        }
    };

    let result = view.reconcile(entries.into_iter().map(RemoteRecord::from_value));
    to_c_string(FfiResult::ok(result).to_json())
}

// ============================================================================
// Queries
// ============================================================================

/// Get all records, newest first.
///
/// # Returns
/// JSON string: `{"ok": [Record, ...]}` or `{"error": "message"}`
///
/// # Safety
/// - `view` must be a valid view pointer or null
/// - Caller must free the returned string with `feedsync_string_free`
#[no_mangle]
pub unsafe extern "C" fn feedsync_view_records(view: *const OrderedSyncView) -> *mut c_char {
    let view = match view.as_ref() {
        Some(v) => v,
        None => return to_c_string(FfiResult::<()>::err("null view pointer").to_json()),
    };

    let records: Vec<_> = view.iter().collect();
    to_c_string(FfiResult::ok(records).to_json())
}

/// Get the number of records, or -1 for a null view.
///
/// # Safety
/// - `view` must be a valid view pointer or null
#[no_mangle]
pub unsafe extern "C" fn feedsync_view_len(view: *const OrderedSyncView) -> i64 {
    match view.as_ref() {
        Some(v) => v.len() as i64,
        None => -1,
    }
}

/// Get the watermark, or -1 for an empty or null view.
///
/// Timestamps above `i64::MAX` are clamped.
///
/// # Safety
/// - `view` must be a valid view pointer or null
#[no_mangle]
pub unsafe extern "C" fn feedsync_view_watermark(view: *const OrderedSyncView) -> i64 {
    match view.as_ref().and_then(|v| v.watermark()) {
        Some(ts) => i64::try_from(ts).unwrap_or(i64::MAX),
        None => -1,
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Export the view as a snapshot.
///
/// # Returns
/// JSON string: `{"ok": ViewSnapshot}` or `{"error": "message"}`
///
/// # Safety
/// - `view` must be a valid view pointer or null
/// - Caller must free the returned string with `feedsync_string_free`
#[no_mangle]
pub unsafe extern "C" fn feedsync_view_export(view: *const OrderedSyncView) -> *mut c_char {
    let view = match view.as_ref() {
        Some(v) => v,
        None => return to_c_string(FfiResult::<()>::err("null view pointer").to_json()),
    };

    to_c_string(FfiResult::ok(view.export_snapshot()).to_json())
}

// ============================================================================
// Utility
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn feedsync_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Get the snapshot format version.
#[no_mangle]
pub extern "C" fn feedsync_snapshot_format_version() -> u32 {
    crate::SNAPSHOT_FORMAT_VERSION
}
