//! HTTP client for the categorization backend
//!
//! - `POST /generate?token=&playlist_id=&num_categories=` with
//!   `{"categories": [...]}` streams track records back
//! - `GET /total_tracks?playlist_id=` returns the playlist's track count

use super::{CategorizeRequest, ChunkStream, StreamSource, TotalCountSource};
use crate::error::{IngestError, IngestResult};
use crate::models::Category;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("pcat-ingest/", env!("CARGO_PKG_VERSION"));

/// Backend client implementing both network collaborators
#[derive(Debug, Clone)]
pub struct HttpCategorizer {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    categories: &'a [Category],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TotalBody {
    Bare(u64),
    TotalTracks { total_tracks: u64 },
    Total { total: u64 },
}

#[derive(Deserialize)]
struct ErrorBody {
    error: serde_json::Value,
}

impl HttpCategorizer {
    /// Create a client; no overall request timeout since streams are long-lived
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> IngestResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl StreamSource for HttpCategorizer {
    async fn open(&self, request: &CategorizeRequest) -> IngestResult<ChunkStream> {
        let url = format!("{}/generate", self.base_url);
        tracing::debug!(
            url = %url,
            playlist_id = %request.playlist_id,
            num_categories = request.num_categories,
            "Requesting categorization stream"
        );

        let response = self
            .http_client
            .post(&url)
            .query(&[
                ("token", request.token.as_str()),
                ("playlist_id", request.playlist_id.as_str()),
            ])
            .query(&[("num_categories", request.num_categories)])
            .json(&GenerateBody {
                categories: &request.categories,
            })
            .send()
            .await?;

        let response = ensure_success(response).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(IngestError::from))
            .boxed())
    }
}

#[async_trait]
impl TotalCountSource for HttpCategorizer {
    async fn fetch_total(&self, playlist_id: &str) -> IngestResult<u64> {
        let url = format!("{}/total_tracks", self.base_url);
        tracing::debug!(url = %url, playlist_id = %playlist_id, "Requesting total track count");

        let response = self
            .http_client
            .get(&url)
            .query(&[("playlist_id", playlist_id)])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        match serde_json::from_str::<TotalBody>(&body) {
            Ok(TotalBody::Bare(total))
            | Ok(TotalBody::TotalTracks { total_tracks: total })
            | Ok(TotalBody::Total { total }) => Ok(total),
            Err(e) => Err(IngestError::Upstream {
                status,
                message: format!("unexpected total payload: {}", e),
            }),
        }
    }
}

/// Map a non-success response to `Upstream`, preferring the body's `error`
async fn ensure_success(response: reqwest::Response) -> IngestResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "request failed".to_string());

    Err(IngestError::Upstream {
        status: status.as_u16(),
        message,
    })
}

/// `{"error": "..."}` or `{"error": {"message": "..."}}`
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.error {
        serde_json::Value::String(message) => Some(message),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        _ => None,
    }
}
