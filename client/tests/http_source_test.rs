//! Integration tests for the HTTP record source.
//!
//! Each test starts an in-process feed server on an ephemeral port.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use feedsync_client::auth::Session;
use feedsync_client::error::{FetchError, SyncError};
use feedsync_client::source::{FeedResponse, HttpRecordSource, RecordSource};
use feedsync_client::sync::{SyncController, Trigger};
use feedsync_engine::{OrderedSyncView, Record, RemoteRecord, Timestamp};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TOKEN: &str = "secret-token";

#[derive(Clone, Default)]
struct FeedState {
    records: Arc<Mutex<Vec<RemoteRecord>>>,
    request_ids: Arc<Mutex<Vec<String>>>,
}

impl FeedState {
    fn publish(&self, timestamps: &[Timestamp]) {
        let mut records = self.records.lock().unwrap();
        records.extend(timestamps.iter().map(|ts| {
            RemoteRecord::from(Record::with_id(
                format!("photo-{ts}"),
                *ts,
                json!({"caption": format!("photo {ts}")}),
            ))
        }));
    }
}

async fn feed(
    State(state): State<FeedState>,
    headers: HeaderMap,
) -> Result<Json<FeedResponse>, StatusCode> {
    let expected = format!("Bearer {TOKEN}");
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }

    if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        state.request_ids.lock().unwrap().push(id.to_string());
    }

    let records = state.records.lock().unwrap().clone();
    Ok(Json(FeedResponse { records }))
}

async fn broken() -> &'static str {
    "this is not json"
}

async fn partly_broken() -> Json<serde_json::Value> {
    Json(json!({
        "records": [
            {"id": "good", "timestamp": 20, "payload": {"caption": "kept"}},
            {"id": "text", "timestamp": "yesterday"},
            {"id": "negative", "timestamp": -1},
            "not a record",
            {"id": "also-good", "timestamp": 10}
        ]
    }))
}

/// Start a feed server, returning its base URL.
async fn serve(state: FeedState) -> String {
    let app = Router::new()
        .route("/feed", get(feed))
        .route("/broken", get(broken))
        .route("/partly-broken", get(partly_broken))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn source(base: &str, path: &str) -> HttpRecordSource {
    HttpRecordSource::new(format!("{base}{path}"), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn unauthenticated_fetch_is_rejected() {
    let base = serve(FeedState::default()).await;
    let source = source(&base, "/feed");

    let err = source.fetch_all().await.unwrap_err();
    assert!(matches!(err, FetchError::Status(401)));
}

#[tokio::test]
async fn authorized_fetch_returns_the_snapshot() {
    let state = FeedState::default();
    state.publish(&[3, 1, 2]);
    let base = serve(state.clone()).await;

    let source = source(&base, "/feed");
    source.authorize(&Session::new(TOKEN)).await;
    let records = source.fetch_all().await.unwrap();

    let timestamps: Vec<_> = records.iter().map(|r| r.timestamp).collect();
    assert_eq!(timestamps, vec![Some(3), Some(1), Some(2)]);

    let ids = state.request_ids.lock().unwrap();
    assert_eq!(ids.len(), 1);
    assert!(uuid::Uuid::parse_str(&ids[0]).is_ok());
}

#[tokio::test]
async fn unparseable_body_is_an_http_error() {
    let base = serve(FeedState::default()).await;
    let source = source(&base, "/broken");

    let err = source.fetch_all().await.unwrap_err();
    assert!(matches!(err, FetchError::Http(_)));
}

#[tokio::test]
async fn unreachable_server_is_an_http_error() {
    // Bind and drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = source(&format!("http://{addr}"), "/feed");
    let err = source.fetch_all().await.unwrap_err();
    assert!(matches!(err, FetchError::Http(_)));
}

#[tokio::test]
async fn controller_follows_the_feed() {
    let state = FeedState::default();
    state.publish(&[1_000, 3_000, 2_000]);
    let base = serve(state.clone()).await;

    let controller = SyncController::new(source(&base, "/feed"), OrderedSyncView::new());

    // Before login the store refuses, and the view stays empty.
    let err = controller.refresh(Trigger::Refresh).await.unwrap_err();
    assert!(matches!(err, SyncError::Fetch(FetchError::Status(401))));
    assert!(controller.current().records.is_empty());

    controller.source().authorize(&Session::new(TOKEN)).await;
    controller.refresh(Trigger::Authenticated).await.unwrap();

    state.publish(&[5_000, 4_000]);
    controller.refresh(Trigger::Refresh).await.unwrap();
    controller.refresh(Trigger::Refresh).await.unwrap();

    let view = controller.current();
    let order: Vec<_> = view.records.iter().map(|r| r.timestamp).collect();
    assert_eq!(order, vec![5_000, 4_000, 3_000, 2_000, 1_000]);
    assert_eq!(view.revision, 2);
    assert_eq!(view.records[0].id.as_deref(), Some("photo-5000"));
}

#[tokio::test]
async fn bad_rows_do_not_block_the_feed() {
    let base = serve(FeedState::default()).await;
    let controller = SyncController::new(source(&base, "/partly-broken"), OrderedSyncView::new());

    controller.refresh(Trigger::Refresh).await.unwrap();

    let view = controller.current();
    let ids: Vec<_> = view.records.iter().filter_map(|r| r.id.as_deref()).collect();
    assert_eq!(ids, vec!["good", "also-good"]);
    assert_eq!(controller.stats().records_malformed, 3);
}
