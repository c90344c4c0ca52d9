//! Ingestion session: one categorization run
//!
//! Owns the buckets and progress for the run and drives the pipeline:
//!
//! chunk → `Utf8ChunkDecoder` → `ObjectScanner` → `parse_record` → `route`
//! → `ProgressTracker` → snapshot published to subscribers
//!
//! The working `ResultSet` lives on the session's task and is only ever
//! handed out as an `Arc` copy inside a `Snapshot`, so subscribers never see
//! a bucket mid-append.
//!
//! # Lifecycle
//! - `start` moves IDLE → RUNNING exactly once; later calls are no-ops
//! - precondition failures (no token, no categories) move IDLE → FAILED
//! - stream end moves RUNNING → COMPLETED with a final snapshot
//! - transport/upstream errors move RUNNING → FAILED and publish the error
//! - `cancel` moves to CANCELLED, stops pulling chunks and drops the stream

use crate::decoder::Utf8ChunkDecoder;
use crate::error::{IngestError, IngestResult};
use crate::models::{
    Category, ResultSet, SessionState, SessionUpdate, Snapshot, StateTransition,
};
use crate::progress::ProgressTracker;
use crate::router::{parse_record, route, RouteOutcome};
use crate::scanner::ObjectScanner;
use crate::source::{CategorizeRequest, ChunkStream, CredentialSource, StreamSource, TotalCountSource};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use pcat_common::config::IngestConfig;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Longest record excerpt included in parse-failure logs
const EXCERPT_LEN: usize = 120;

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of the update channel; slow subscribers skip old snapshots
    pub snapshot_capacity: usize,
    /// Fail with a transport error when no chunk arrives for this long
    pub inactivity_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for SessionConfig {
    fn from(config: &IngestConfig) -> Self {
        Self {
            snapshot_capacity: config.snapshot_capacity.max(1),
            inactivity_timeout: config.inactivity_timeout(),
        }
    }
}

/// Playlist to categorize
#[derive(Debug, Clone)]
pub struct Target {
    pub playlist_id: String,
    /// Category count sent to the backend, defaults to the categories supplied
    pub num_categories: Option<usize>,
}

impl Target {
    pub fn new(playlist_id: impl Into<String>) -> Self {
        Self {
            playlist_id: playlist_id.into(),
            num_categories: None,
        }
    }
}

/// What a `start` call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// This call moved the session to RUNNING
    Started,
    /// The session had already left IDLE; nothing happened
    AlreadyStarted(SessionState),
    /// A precondition failed; the session is now FAILED
    Rejected(IngestError),
}

/// Handle to one ingestion run, cheap to clone
#[derive(Clone)]
pub struct IngestionSession {
    inner: Arc<Inner>,
}

struct Inner {
    session_id: Uuid,
    config: SessionConfig,
    credentials: Arc<dyn CredentialSource>,
    shared: Mutex<Shared>,
    updates: broadcast::Sender<SessionUpdate>,
    state_tx: watch::Sender<SessionState>,
    cancel_token: CancellationToken,
    run_task: Mutex<Option<JoinHandle<()>>>,
}

/// State guarded by one lock so publish order matches transition order
struct Shared {
    state: SessionState,
    tracker: ProgressTracker,
    /// Copy of the buckets as of the last publish
    buckets: Arc<ResultSet>,
    latest: Option<SessionUpdate>,
    transitions: Vec<StateTransition>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl IngestionSession {
    pub fn new(config: SessionConfig, credentials: Arc<dyn CredentialSource>) -> Self {
        let (updates, _) = broadcast::channel(config.snapshot_capacity.max(1));
        let (state_tx, _) = watch::channel(SessionState::Idle);

        Self {
            inner: Arc::new(Inner {
                session_id: Uuid::new_v4(),
                config,
                credentials,
                shared: Mutex::new(Shared {
                    state: SessionState::Idle,
                    tracker: ProgressTracker::new(),
                    buckets: Arc::new(ResultSet::default()),
                    latest: None,
                    transitions: Vec::new(),
                    started_at: None,
                    ended_at: None,
                }),
                updates,
                state_tx,
                cancel_token: CancellationToken::new(),
                run_task: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.session_id
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Every transition so far, oldest first
    pub fn transitions(&self) -> Vec<StateTransition> {
        self.lock().transitions.clone()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.lock().started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.lock().ended_at
    }

    /// Most recent snapshot, if one has been taken
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        match &self.lock().latest {
            Some(SessionUpdate::Snapshot(snapshot)) => Some(Arc::clone(snapshot)),
            _ => None,
        }
    }

    /// Start the run
    ///
    /// Only the first call does anything; it checks preconditions, creates
    /// one empty bucket per category and spawns the ingestion task. Must be
    /// called from within a Tokio runtime.
    pub fn start(
        &self,
        target: Target,
        categories: Vec<Category>,
        source: Arc<dyn StreamSource>,
    ) -> StartOutcome {
        let mut shared = self.lock();
        if shared.state != SessionState::Idle {
            debug!(
                session_id = %self.inner.session_id,
                state = ?shared.state,
                "Ignoring start request, session already started"
            );
            return StartOutcome::AlreadyStarted(shared.state);
        }

        let token = match self.inner.credentials.get_token() {
            Some(token) => token,
            None => {
                self.fail_locked(&mut shared, IngestError::MissingCredential);
                return StartOutcome::Rejected(IngestError::MissingCredential);
            }
        };
        if categories.is_empty() {
            self.fail_locked(&mut shared, IngestError::MissingCategories);
            return StartOutcome::Rejected(IngestError::MissingCategories);
        }

        let buckets = ResultSet::from_categories(&categories);
        let request = CategorizeRequest {
            token,
            num_categories: target.num_categories.unwrap_or(categories.len()),
            playlist_id: target.playlist_id,
            categories,
        };

        self.transition(&mut shared, SessionState::Running);
        shared.started_at = Some(Utc::now());
        info!(
            session_id = %self.inner.session_id,
            playlist_id = %request.playlist_id,
            categories = buckets.len(),
            "Categorization session started"
        );
        self.publish_buckets(&mut shared, &buckets);
        drop(shared);

        let session = self.clone();
        let handle = tokio::spawn(async move { session.run(request, buckets, source).await });
        *self.inner.run_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        StartOutcome::Started
    }

    /// Record the expected total; may be called at any time
    ///
    /// A RUNNING session publishes a snapshot with the new percentage. A
    /// COMPLETED session updates `latest()` without publishing.
    pub fn set_total(&self, total: u64) {
        let mut shared = self.lock();
        shared.tracker.set_total(total);
        debug!(session_id = %self.inner.session_id, total, "Total track count set");

        match shared.state {
            SessionState::Running => {
                let update = SessionUpdate::Snapshot(self.snapshot(&shared));
                self.publish(&mut shared, update);
            }
            SessionState::Completed => {
                shared.latest = Some(SessionUpdate::Snapshot(self.snapshot(&shared)));
            }
            _ => {}
        }
    }

    /// Fetch the total independently of the stream
    ///
    /// A failed fetch is logged and leaves the percentage unavailable.
    pub fn track_total(
        &self,
        source: Arc<dyn TotalCountSource>,
        playlist_id: impl Into<String>,
    ) -> JoinHandle<()> {
        let session = self.clone();
        let playlist_id = playlist_id.into();
        let cancel_token = self.inner.cancel_token.clone();

        tokio::spawn(async move {
            let fetched = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => return,
                fetched = source.fetch_total(&playlist_id) => fetched,
            };
            match fetched {
                Ok(total) => session.set_total(total),
                Err(e) => warn!(
                    session_id = %session.id(),
                    error = %e,
                    "Total track count unavailable"
                ),
            }
        })
    }

    /// Subscribe to snapshots and the terminal error
    pub fn subscribe(&self) -> Subscription {
        let shared = self.lock();
        let replay = if shared.state == SessionState::Cancelled {
            None
        } else {
            shared.latest.clone()
        };
        Subscription {
            session_id: self.inner.session_id,
            replay,
            rx: self.inner.updates.subscribe(),
            cancel_token: self.inner.cancel_token.clone(),
            finished: false,
        }
    }

    /// Callback form of `subscribe`, driven by a spawned task
    ///
    /// `on_error` runs at most once, after which the task ends.
    pub fn subscribe_with<S, E>(&self, mut on_snapshot: S, on_error: E) -> JoinHandle<()>
    where
        S: FnMut(Arc<Snapshot>) + Send + 'static,
        E: FnOnce(IngestError) + Send + 'static,
    {
        let mut subscription = self.subscribe();
        tokio::spawn(async move {
            while let Some(update) = subscription.next().await {
                match update {
                    SessionUpdate::Snapshot(snapshot) => on_snapshot(snapshot),
                    SessionUpdate::Failed(error) => {
                        on_error(error);
                        break;
                    }
                }
            }
        })
    }

    /// Tear the session down; a no-op once terminal
    pub fn cancel(&self) {
        let mut shared = self.lock();
        if !self.transition(&mut shared, SessionState::Cancelled) {
            return;
        }
        shared.ended_at = Some(Utc::now());
        drop(shared);

        info!(session_id = %self.inner.session_id, "Categorization session cancelled");
        self.inner.cancel_token.cancel();
    }

    /// Wait for a terminal state and for the ingestion task to release the stream
    ///
    /// Never returns for a session that is never started or cancelled.
    pub async fn wait(&self) -> SessionState {
        let mut state_rx = self.inner.state_tx.subscribe();
        let state = match state_rx.wait_for(SessionState::is_terminal).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };

        let handle = self
            .inner
            .run_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(session_id = %self.inner.session_id, error = %e, "Ingestion task ended abnormally");
            }
        }
        state
    }

    async fn run(self, request: CategorizeRequest, mut buckets: ResultSet, source: Arc<dyn StreamSource>) {
        let cancel_token = self.inner.cancel_token.clone();

        let opened = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return,
            opened = self.open_stream(source.as_ref(), &request) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        let mut decoder = Utf8ChunkDecoder::new();
        let mut scanner = ObjectScanner::new();
        let mut chunks = 0u64;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    debug!(session_id = %self.inner.session_id, chunks, "Stopped pulling chunks");
                    return;
                }
                next = self.next_chunk(&mut stream) => next,
            };

            match next {
                Ok(Some(chunk)) => {
                    chunks += 1;
                    scanner.push(&decoder.feed(&chunk));
                    self.ingest_objects(&mut scanner, &mut buckets);
                    debug!(
                        session_id = %self.inner.session_id,
                        chunk = chunks,
                        bytes = chunk.len(),
                        processed = buckets.total_tracks(),
                        "Chunk processed"
                    );
                    if !self.publish_progress(&buckets) {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    self.fail(e);
                    return;
                }
            }
        }
        drop(stream);

        scanner.push(&decoder.finish());
        self.ingest_objects(&mut scanner, &mut buckets);
        if let Some(leftover) = scanner.finish() {
            warn!(
                session_id = %self.inner.session_id,
                excerpt = %excerpt(&leftover),
                "Stream ended inside a record, discarding it"
            );
        }

        self.complete(&buckets, chunks);
    }

    /// Open the stream; the inactivity limit also bounds the wait for a response
    async fn open_stream(
        &self,
        source: &dyn StreamSource,
        request: &CategorizeRequest,
    ) -> IngestResult<ChunkStream> {
        match self.inner.config.inactivity_timeout {
            Some(limit) => tokio::time::timeout(limit, source.open(request))
                .await
                .map_err(|_| IngestError::inactivity(limit))?,
            None => source.open(request).await,
        }
    }

    async fn next_chunk(&self, stream: &mut ChunkStream) -> IngestResult<Option<Vec<u8>>> {
        let item = match self.inner.config.inactivity_timeout {
            Some(limit) => tokio::time::timeout(limit, stream.next())
                .await
                .map_err(|_| IngestError::inactivity(limit))?,
            None => stream.next().await,
        };
        item.transpose()
    }

    /// Parse and route every complete object buffered in the scanner
    fn ingest_objects(&self, scanner: &mut ObjectScanner, buckets: &mut ResultSet) {
        for object in scanner.objects() {
            let record = match parse_record(&object) {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        session_id = %self.inner.session_id,
                        error = %e,
                        excerpt = %excerpt(&object),
                        "Skipping malformed record"
                    );
                    continue;
                }
            };

            let raw_name = record.category_name.clone();
            match route(record, buckets) {
                RouteOutcome::Routed { key, position } => {
                    trace!(session_id = %self.inner.session_id, key = %key, position, "Record routed");
                }
                RouteOutcome::Dropped { unknown_name } => {
                    warn!(
                        session_id = %self.inner.session_id,
                        category = %raw_name,
                        sanitized = %unknown_name,
                        "Dropping record for unknown category"
                    );
                }
            }
        }
    }

    /// Publish after a chunk; false once the session left RUNNING
    fn publish_progress(&self, buckets: &ResultSet) -> bool {
        let mut shared = self.lock();
        if shared.state != SessionState::Running {
            return false;
        }
        self.publish_buckets(&mut shared, buckets);
        true
    }

    fn complete(&self, buckets: &ResultSet, chunks: u64) {
        let mut shared = self.lock();
        if !self.transition(&mut shared, SessionState::Completed) {
            return;
        }
        shared.ended_at = Some(Utc::now());
        info!(
            session_id = %self.inner.session_id,
            chunks,
            processed = buckets.total_tracks(),
            "Categorization session completed"
        );
        self.publish_buckets(&mut shared, buckets);
    }

    fn fail(&self, error: IngestError) {
        let mut shared = self.lock();
        self.fail_locked(&mut shared, error);
    }

    fn fail_locked(&self, shared: &mut Shared, error: IngestError) {
        if !self.transition(shared, SessionState::Failed) {
            return;
        }
        shared.ended_at = Some(Utc::now());
        warn!(
            session_id = %self.inner.session_id,
            kind = ?error.kind(),
            error = %error,
            "Categorization session failed"
        );
        self.publish(shared, SessionUpdate::Failed(error));
    }

    /// Copy the working buckets, recompute progress and publish
    fn publish_buckets(&self, shared: &mut Shared, buckets: &ResultSet) {
        shared.tracker.recompute(buckets);
        shared.buckets = Arc::new(buckets.clone());
        let update = SessionUpdate::Snapshot(self.snapshot(shared));
        self.publish(shared, update);
    }

    fn snapshot(&self, shared: &Shared) -> Arc<Snapshot> {
        Arc::new(Snapshot {
            session_id: self.inner.session_id,
            state: shared.state,
            buckets: Arc::clone(&shared.buckets),
            progress: shared.tracker.state(),
            taken_at: Utc::now(),
        })
    }

    fn publish(&self, shared: &mut Shared, update: SessionUpdate) {
        shared.latest = Some(update.clone());
        if let Ok(receivers) = self.inner.updates.send(update) {
            trace!(session_id = %self.inner.session_id, receivers, "Update published");
        }
    }

    /// Apply a legal transition; false if `next` is not reachable
    fn transition(&self, shared: &mut Shared, next: SessionState) -> bool {
        if !shared.state.can_transition_to(next) {
            return false;
        }
        let transition = StateTransition {
            session_id: self.inner.session_id,
            old_state: shared.state,
            new_state: next,
            transitioned_at: Utc::now(),
        };
        debug!(
            session_id = %self.inner.session_id,
            from = ?transition.old_state,
            to = ?transition.new_state,
            "Session state transition"
        );
        shared.state = next;
        shared.transitions.push(transition);
        self.inner.state_tx.send_replace(next);
        true
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.inner.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stream of updates for one subscriber
///
/// Replays the latest update first, so a subscriber that arrives after a
/// precondition failure still sees the error. Ends after a terminal update
/// or when the session is cancelled.
pub struct Subscription {
    session_id: Uuid,
    replay: Option<SessionUpdate>,
    rx: broadcast::Receiver<SessionUpdate>,
    cancel_token: CancellationToken,
    finished: bool,
}

impl Subscription {
    pub async fn next(&mut self) -> Option<SessionUpdate> {
        if self.finished {
            return None;
        }
        if let Some(update) = self.replay.take() {
            self.finished = update.is_terminal();
            return Some(update);
        }

        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => None,
                received = self.rx.recv() => Some(received),
            };
            let Some(received) = received else {
                self.finished = true;
                return None;
            };

            match received {
                Ok(update) => {
                    self.finished = update.is_terminal();
                    return Some(update);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        session_id = %self.session_id,
                        skipped,
                        "Subscriber lagged, skipping stale snapshots"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_LEN {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_LEN).collect();
    format!("{}…", cut)
}
