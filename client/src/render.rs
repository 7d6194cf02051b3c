//! Console rendering of the view.

use crate::sync::ViewState;
use chrono::{DateTime, SecondsFormat};
use feedsync_engine::{Record, Timestamp};
use std::fmt::Write;

/// Render the whole view, newest first, one record per line.
pub fn render(state: &ViewState) -> String {
    let mut out = format!(
        "── feed revision {} · {} record(s) ──\n",
        state.revision,
        state.records.len()
    );
    for record in state.records.iter() {
        let _ = writeln!(out, "{}", render_record(record));
    }
    out
}

/// Render a single record as `<time>  <id>  <caption>`.
pub fn render_record(record: &Record) -> String {
    let id = record.id.as_deref().unwrap_or("-");
    let caption = record
        .payload
        .get("caption")
        .and_then(|c| c.as_str())
        .unwrap_or("");
    format!("{}  {}  {}", format_timestamp(record.timestamp), id, caption)
        .trim_end()
        .to_string()
}

/// Millisecond timestamps as RFC 3339, anything out of range verbatim.
fn format_timestamp(timestamp: Timestamp) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| timestamp.to_string())
}
