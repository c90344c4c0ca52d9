//! External collaborators consumed by the ingestion core
//!
//! - `CredentialSource`: synchronous access token lookup
//! - `StreamSource`: opens the categorization byte stream
//! - `TotalCountSource`: fetches the expected track count
//!
//! `HttpCategorizer` implements both network traits against the backend.

pub mod http;

pub use http::HttpCategorizer;

use crate::error::IngestResult;
use crate::models::Category;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;

/// Raw byte chunks; boundaries carry no meaning
pub type ChunkStream = BoxStream<'static, IngestResult<Vec<u8>>>;

/// Everything the backend needs to start a categorization run
#[derive(Debug, Clone, Serialize)]
pub struct CategorizeRequest {
    #[serde(skip)]
    pub token: String,
    pub playlist_id: String,
    pub num_categories: usize,
    pub categories: Vec<Category>,
}

/// Access token lookup
pub trait CredentialSource: Send + Sync {
    /// `None` when no token is available
    fn get_token(&self) -> Option<String>;
}

/// Token resolved once at startup
#[derive(Debug, Clone, Default)]
pub struct StaticCredential {
    token: Option<String>,
}

impl StaticCredential {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    pub fn absent() -> Self {
        Self { token: None }
    }
}

impl CredentialSource for StaticCredential {
    fn get_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Opens the categorization stream
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Issue the request; a non-success status is an `Upstream` error
    async fn open(&self, request: &CategorizeRequest) -> IngestResult<ChunkStream>;
}

/// Fetches the number of tracks the stream is expected to produce
#[async_trait]
pub trait TotalCountSource: Send + Sync {
    async fn fetch_total(&self, playlist_id: &str) -> IngestResult<u64>;
}
