//! HTTP record source.

use super::RecordSource;
use crate::auth::Session;
use crate::error::FetchError;
use feedsync_engine::RemoteRecord;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Body of a feed snapshot response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    /// Every record the store holds, in no particular order
    #[serde(default, deserialize_with = "feedsync_engine::record::deserialize_batch")]
    pub records: Vec<RemoteRecord>,
}

/// Fetches snapshots with `GET <feed_url>`.
#[derive(Debug)]
pub struct HttpRecordSource {
    client: reqwest::Client,
    url: String,
    token: RwLock<Option<String>>,
}

impl HttpRecordSource {
    /// Create a source for the given endpoint.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token: RwLock::new(None),
        })
    }

    /// Get the feed URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Set the bearer token sent with every request.
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    async fn fetch(&self) -> Result<Vec<RemoteRecord>, FetchError> {
        let request_id = Uuid::new_v4();
        let token = self.token.read().await.clone();

        let mut request = self
            .client
            .get(&self.url)
            .header("x-request-id", request_id.to_string());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%request_id, status = status.as_u16(), "Feed request rejected");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: FeedResponse = response.json().await?;
        tracing::debug!(%request_id, records = body.records.len(), "Fetched feed snapshot");

        Ok(body.records)
    }
}

impl RecordSource for HttpRecordSource {
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<RemoteRecord>, FetchError>> {
        Box::pin(self.fetch())
    }

    fn authorize(&self, session: &Session) -> BoxFuture<'_, ()> {
        let token = session.token.clone();
        Box::pin(self.set_token(token))
    }
}
