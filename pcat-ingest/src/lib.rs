//! pcat-ingest library interface
//!
//! Streaming categorization ingestion: consumes the backend's chunked stream
//! of JSON track records, buckets each record into its category, tracks
//! progress against an independently fetched total, and publishes immutable
//! snapshots to subscribers.

pub mod bridge;
pub mod decoder;
pub mod error;
pub mod models;
pub mod progress;
pub mod router;
pub mod scanner;
pub mod session;
pub mod source;

pub use crate::error::{ErrorKind, IngestError, IngestResult};
pub use crate::session::{IngestionSession, SessionConfig, StartOutcome, Subscription, Target};
