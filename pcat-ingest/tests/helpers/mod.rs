//! Test Helper Utilities
//!
//! Scripted stream and total-count sources for driving ingestion sessions

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use pcat_ingest::models::{Category, SessionUpdate, Snapshot};
use pcat_ingest::source::{
    CategorizeRequest, ChunkStream, StaticCredential, StreamSource, TotalCountSource,
};
use pcat_ingest::{IngestError, IngestResult, IngestionSession, SessionConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// How a scripted stream behaves after its last chunk
#[derive(Debug, Clone)]
pub enum Ending {
    Eof,
    Error(IngestError),
    /// Never yields again
    Hang,
}

/// Stream source replaying fixed chunks
pub struct ScriptedSource {
    chunks: Vec<Vec<u8>>,
    ending: Ending,
    open_error: Option<IngestError>,
    opens: AtomicUsize,
    released: Arc<AtomicBool>,
    last_request: Mutex<Option<CategorizeRequest>>,
}

impl ScriptedSource {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            ending: Ending::Eof,
            open_error: None,
            opens: AtomicUsize::new(0),
            released: Arc::new(AtomicBool::new(false)),
            last_request: Mutex::new(None),
        }
    }

    pub fn from_strs(chunks: &[&str]) -> Self {
        Self::new(chunks.iter().map(|c| c.as_bytes().to_vec()).collect())
    }

    pub fn failing_open(error: IngestError) -> Self {
        let mut source = Self::new(Vec::new());
        source.open_error = Some(error);
        source
    }

    pub fn ending(mut self, ending: Ending) -> Self {
        self.ending = ending;
        self
    }

    /// Number of times the stream was requested
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Whether the opened stream has been dropped
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CategorizeRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

struct ReleaseGuard(Arc<AtomicBool>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StreamSource for ScriptedSource {
    async fn open(&self, request: &CategorizeRequest) -> IngestResult<ChunkStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }

        let chunks = self.chunks.clone();
        let ending = self.ending.clone();
        let guard = ReleaseGuard(Arc::clone(&self.released));

        Ok(async_stream::stream! {
            let _guard = guard;
            for chunk in chunks {
                tokio::task::yield_now().await;
                yield Ok(chunk);
            }
            match ending {
                Ending::Eof => {}
                Ending::Error(error) => {
                    yield Err(error);
                }
                Ending::Hang => {
                    futures::future::pending::<()>().await;
                }
            }
        }
        .boxed())
    }
}

/// Stream source fed chunk by chunk from the test
pub struct ChannelSource {
    rx: Mutex<Option<mpsc::UnboundedReceiver<IngestResult<Vec<u8>>>>>,
}

impl ChannelSource {
    pub fn new() -> (Self, mpsc::UnboundedSender<IngestResult<Vec<u8>>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl StreamSource for ChannelSource {
    async fn open(&self, _request: &CategorizeRequest) -> IngestResult<ChunkStream> {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| IngestError::Transport("stream already opened".to_string()))?;

        Ok(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }
}

/// Stream source whose response never arrives
#[derive(Default)]
pub struct StalledSource {
    opens: AtomicUsize,
}

impl StalledSource {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamSource for StalledSource {
    async fn open(&self, _request: &CategorizeRequest) -> IngestResult<ChunkStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        futures::future::pending().await
    }
}

/// Total-count source answering after a delay
pub struct DelayedTotal {
    result: IngestResult<u64>,
    delay: Duration,
}

impl DelayedTotal {
    pub fn ok(total: u64, delay: Duration) -> Self {
        Self {
            result: Ok(total),
            delay,
        }
    }

    pub fn err(error: IngestError) -> Self {
        Self {
            result: Err(error),
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl TotalCountSource for DelayedTotal {
    async fn fetch_total(&self, _playlist_id: &str) -> IngestResult<u64> {
        tokio::time::sleep(self.delay).await;
        self.result.clone()
    }
}

pub fn categories() -> Vec<Category> {
    vec![
        Category::new("Chill*", "d1"),
        Category::new("Energetic", "d2"),
    ]
}

/// Session with a token and default config
pub fn session() -> IngestionSession {
    session_with(SessionConfig::default())
}

pub fn session_with(config: SessionConfig) -> IngestionSession {
    IngestionSession::new(
        config,
        Arc::new(StaticCredential::new(Some("test-token".to_string()))),
    )
}

/// One serialized track record
pub fn record_json(track: &str, category: &str) -> String {
    serde_json::json!({
        "track_name": track,
        "artists": ["x"],
        "album": "al",
        "release_date": "2020",
        "reasoning": format!("because {}", track),
        "category_name": category,
    })
    .to_string()
}

/// Records framed the way the backend writes them
pub fn framed(records: &[String]) -> String {
    format!("[\n{}\n]", records.join(",\n"))
}

/// Collect every update until the subscription ends
pub async fn collect(session: &IngestionSession) -> Vec<SessionUpdate> {
    let mut subscription = session.subscribe();
    let mut updates = Vec::new();
    while let Some(update) = subscription.next().await {
        updates.push(update);
    }
    updates
}

pub fn snapshots(updates: &[SessionUpdate]) -> Vec<Arc<Snapshot>> {
    updates
        .iter()
        .filter_map(|u| match u {
            SessionUpdate::Snapshot(s) => Some(Arc::clone(s)),
            SessionUpdate::Failed(_) => None,
        })
        .collect()
}

pub fn track_names(snapshot: &Snapshot, key: &str) -> Vec<String> {
    snapshot
        .buckets
        .tracks(key)
        .unwrap_or_default()
        .iter()
        .map(|t| t.track_name.clone())
        .collect()
}
