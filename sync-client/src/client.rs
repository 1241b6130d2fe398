//! SyncClient - the synchronization core of docsync.
//!
//! This module provides [`SyncClient`], which keeps one client's edit buffer
//! consistent with the other members of a document's room by broadcasting
//! content operations.
//!
//! # Architecture
//!
//! SyncClient uses a pure state machine (from sync-core) for the session
//! lifecycle and interprets its actions to perform actual I/O via the
//! Transport and DocumentStore traits.
//!
//! ```text
//! Editing surface → SyncClient → Transport → Room
//!                       ↓
//!              sync-core (edit buffer, state machine, outbox)
//! ```
//!
//! Every entry point runs under one async mutex guarding the buffer, the
//! session state, the apply state and the outbox, so local changes and
//! remote batches are never processed concurrently.
//!
//! # Example
//!
//! ```ignore
//! use docsync_client::{MemoryStore, MockTransport, SyncClient, SyncConfig};
//!
//! let client = SyncClient::new(SyncConfig::default(), MockTransport::new(), MemoryStore::new());
//! client.open_session(document_id, Content::paragraph("hello")).await?;
//! client.apply_local(vec![Operation::insert_text(vec![0, 0], 5, " world")]).await?;
//! ```

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use docsync_core::{
    content_operations, Action, ApplyReport, EditBuffer, Event, Generation, Outbox,
    SessionEvent, SessionState,
};
use docsync_types::{ClientId, Content, Document, DocumentId, Operation, OperationBatch};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, MutexGuard, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::store::{DocumentStore, StoreError};
use crate::transport::{Transport, TransportError};

/// Delay before retrying a failed receive when no reconnect is scheduled.
const IDLE_RETRY: Duration = Duration::from_secs(1);

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Document store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The operation needs an open session.
    #[error("no open session")]
    NoSession,

    /// Another open or a close happened while this open was in flight.
    #[error("opening {document_id} was superseded by a newer session")]
    Superseded {
        /// The document whose open was abandoned.
        document_id: DocumentId,
    },
}

/// Configuration for SyncClient.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Identity stamped on every outgoing batch.
    pub client_id: ClientId,
    /// Human-readable client name (for logs).
    pub client_name: String,
    /// Maximum number of batches held while offline.
    pub outbox_capacity: usize,
    /// Whether `run()` re-joins the room after a receive failure.
    pub auto_reconnect: bool,
    /// Capacity of the session event channel.
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            client_id: ClientId::new(),
            client_name: "docsync client".to_string(),
            outbox_capacity: 256,
            auto_reconnect: true,
            event_capacity: 64,
        }
    }
}

impl SyncConfig {
    /// Create a configuration with a fresh client id.
    pub fn new(client_name: &str) -> Self {
        Self::default().with_client_name(client_name)
    }

    /// Set the client id.
    pub fn with_client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    /// Set the client name.
    pub fn with_client_name(mut self, name: &str) -> Self {
        self.client_name = name.to_string();
        self
    }

    /// Set the outbox capacity.
    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity;
        self
    }

    /// Enable or disable automatic reconnection in `run()`.
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the session event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

/// Whether the buffer is currently being mutated by a remote batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApplyState {
    Idle,
    ApplyingRemote,
}

/// Session lock held while a remote batch is applied.
///
/// Sets `ApplyingRemote` on creation and restores `Idle` on drop.
struct RemoteApply<'a> {
    session: MutexGuard<'a, Session>,
}

impl<'a> RemoteApply<'a> {
    fn begin(mut session: MutexGuard<'a, Session>) -> Self {
        session.apply = ApplyState::ApplyingRemote;
        Self { session }
    }
}

impl Deref for RemoteApply<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl DerefMut for RemoteApply<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

impl Drop for RemoteApply<'_> {
    fn drop(&mut self) {
        self.session.apply = ApplyState::Idle;
    }
}

/// What woke the driver loop.
enum Wake {
    Shutdown,
    Retry,
    Received(Result<OperationBatch, TransportError>),
}

/// Everything guarded by the session lock.
#[derive(Debug)]
struct Session {
    state: SessionState,
    buffer: Option<EditBuffer>,
    apply: ApplyState,
    outbox: Outbox,
    next_generation: Generation,
    reconnect_delay: Option<Duration>,
}

impl Session {
    /// Drop everything that belonged to the previous session.
    fn reset(&mut self) {
        self.buffer = None;
        self.apply = ApplyState::Idle;
        self.outbox.clear();
        self.reconnect_delay = None;
    }
}

/// The synchronization core.
///
/// Owns its transport and document store; at most one document room is
/// joined at any time.
pub struct SyncClient<T: Transport, S: DocumentStore> {
    config: SyncConfig,
    transport: T,
    store: S,
    session: Mutex<Session>,
    events: broadcast::Sender<SessionEvent>,
    shutdown: Notify,
}

impl<T: Transport, S: DocumentStore> SyncClient<T, S> {
    /// Create a new SyncClient.
    pub fn new(config: SyncConfig, transport: T, store: S) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let session = Session {
            state: SessionState::new(),
            buffer: None,
            apply: ApplyState::Idle,
            outbox: Outbox::new(config.outbox_capacity),
            next_generation: Generation::default(),
            reconnect_delay: None,
        };
        Self {
            config,
            transport,
            store,
            session: Mutex::new(session),
            events,
            shutdown: Notify::new(),
        }
    }

    // ===========================================
    // Session lifecycle
    // ===========================================

    /// Open a session on `document_id` with caller-supplied content.
    ///
    /// Any current session is torn down first: its room is left before the
    /// new one is joined. If the join fails the session stays open offline
    /// with its buffer and the transport error is returned.
    pub async fn open_session(
        &self,
        document_id: DocumentId,
        initial_content: Content,
    ) -> Result<(), ClientError> {
        let mut session = self.session.lock().await;
        let generation = self.begin_open(&mut session, &document_id).await;

        session.buffer = Some(EditBuffer::new(initial_content));
        self.dispatch(&mut session, Event::ContentReady { generation })
            .await?;
        Ok(())
    }

    /// Open a session on `document_id`, fetching its content from the store.
    ///
    /// The fetch runs without holding the session lock. If the session was
    /// closed or replaced meanwhile, the fetched document is discarded and
    /// [`ClientError::Superseded`] is returned.
    pub async fn open_document(&self, document_id: DocumentId) -> Result<Document, ClientError> {
        let generation = {
            let mut session = self.session.lock().await;
            self.begin_open(&mut session, &document_id).await
        };

        let fetched = self.store.fetch_document(&document_id).await;

        let mut session = self.session.lock().await;
        if session.state.generation() != Some(generation) {
            debug!(
                document = %document_id,
                generation = %generation,
                "discarding fetch for superseded session"
            );
            return Err(ClientError::Superseded { document_id });
        }

        let mut document = match fetched {
            Ok(document) => document,
            Err(e) => {
                warn!(document = %document_id, error = %e, "failed to fetch document");
                self.dispatch(&mut session, Event::CloseRequested).await?;
                session.reset();
                return Err(e.into());
            }
        };

        let buffer = EditBuffer::new(document.content);
        document.content = buffer.content().clone();
        session.buffer = Some(buffer);
        self.dispatch(&mut session, Event::ContentReady { generation })
            .await?;
        Ok(document)
    }

    /// Tear down the current session and enter `Opening` for `document_id`.
    async fn begin_open(&self, session: &mut Session, document_id: &DocumentId) -> Generation {
        let generation = session.next_generation.next();
        session.next_generation = generation;

        // Leave failures are logged by dispatch; teardown proceeds regardless.
        let _ = self
            .dispatch(
                session,
                Event::OpenRequested {
                    document_id: document_id.clone(),
                    generation,
                },
            )
            .await;
        session.reset();

        info!(
            client = %self.config.client_name,
            document = %document_id,
            generation = %generation,
            "opening session"
        );
        generation
    }

    /// Close the current session.
    ///
    /// Leaves the room, drops the buffer and any queued offline batches.
    /// Calling it with no open session is a no-op.
    pub async fn close_session(&self) {
        let mut session = self.session.lock().await;
        if session.state == SessionState::Closed {
            return;
        }
        if let Some(document_id) = session.state.document_id() {
            info!(document = %document_id, "closing session");
        }
        let _ = self.dispatch(&mut session, Event::CloseRequested).await;
        session.reset();
    }

    /// Re-join the room of an offline session and flush the outbox.
    ///
    /// Does nothing unless the session is offline.
    pub async fn reconnect(&self) -> Result<(), ClientError> {
        let mut session = self.session.lock().await;
        if !session.state.is_offline() {
            return Ok(());
        }
        session.reconnect_delay = None;
        self.dispatch(&mut session, Event::ReconnectRequested)
            .await?;
        if let Some(document_id) = session.state.document_id() {
            info!(document = %document_id, live = session.state.is_live(), "reconnect attempted");
        }
        Ok(())
    }

    /// Close the session and stop [`SyncClient::run`].
    pub async fn shutdown(&self) {
        self.close_session().await;
        self.shutdown.notify_one();
    }

    // ===========================================
    // Local and remote changes
    // ===========================================

    /// Handle a change notification from the editing surface.
    ///
    /// The snapshot always replaces the buffer content. Content operations
    /// are broadcast as one batch when live, queued when offline, and never
    /// sent while a remote batch is being applied. Ignored without a session.
    pub async fn on_local_change(
        &self,
        snapshot: Content,
        raw_operations: Vec<Operation>,
    ) -> Result<(), ClientError> {
        let mut session = self.session.lock().await;
        self.local_change(&mut session, snapshot, &raw_operations)
            .await?;
        Ok(())
    }

    /// Apply local edits through the core.
    ///
    /// The operations are applied to the buffer, then the resulting change
    /// takes the same path as [`SyncClient::on_local_change`].
    pub async fn apply_local(
        &self,
        raw_operations: Vec<Operation>,
    ) -> Result<ApplyReport, ClientError> {
        let mut session = self.session.lock().await;
        let buffer = session.buffer.as_mut().ok_or(ClientError::NoSession)?;

        let report = buffer.apply_batch(&raw_operations);
        let change = buffer.take_change();
        if let Some(change) = change {
            self.local_change(&mut session, change.snapshot, &change.operations)
                .await?;
        }
        Ok(report)
    }

    /// Apply a batch received from another room member.
    ///
    /// Batches without an open session, for another document, or from this
    /// client are discarded. Operations are applied in order; failures are
    /// logged and skipped.
    pub async fn on_remote_batch(&self, batch: OperationBatch) -> ApplyReport {
        let session = self.session.lock().await;

        let document_id = match session.state.document_id() {
            Some(current) if *current == batch.document_id => current.clone(),
            Some(current) => {
                debug!(
                    current = %current,
                    batch = %batch.document_id,
                    "discarding batch for another document"
                );
                return ApplyReport::default();
            }
            None => {
                debug!(batch = %batch.document_id, "discarding batch, no open session");
                return ApplyReport::default();
            }
        };
        if batch.origin == self.config.client_id {
            debug!(document = %document_id, "discarding own batch");
            return ApplyReport::default();
        }

        // Cleared on drop, including when applying unwinds.
        let mut session = RemoteApply::begin(session);

        let Some(buffer) = session.buffer.as_mut() else {
            debug!(document = %document_id, "discarding batch, content not loaded");
            return ApplyReport::default();
        };
        let report = buffer.apply_batch(&batch.operations);
        let change = buffer.take_change();

        for failure in &report.failures {
            warn!(
                document = %document_id,
                index = failure.index,
                operation = failure.operation,
                error = %failure.error,
                "skipping remote operation"
            );
        }

        // Still flagged: the change notification refreshes the snapshot
        // but must not go back out.
        if let Some(change) = change {
            if let Err(e) = self
                .local_change(&mut session, change.snapshot, &change.operations)
                .await
            {
                warn!(document = %document_id, error = %e, "local change during remote apply failed");
            }
        }

        self.emit(SessionEvent::RemoteApplied {
            document_id,
            origin: batch.origin,
            applied: report.applied,
            failed: report.failed(),
        });
        report
    }

    /// The local change path shared by every entry point.
    async fn local_change(
        &self,
        session: &mut Session,
        snapshot: Content,
        raw_operations: &[Operation],
    ) -> Result<(), TransportError> {
        let Some(buffer) = session.buffer.as_mut() else {
            debug!("ignoring local change, no open session");
            return Ok(());
        };
        buffer.replace(snapshot);

        if session.apply == ApplyState::ApplyingRemote {
            return Ok(());
        }

        let operations = content_operations(raw_operations);
        if operations.is_empty() {
            return Ok(());
        }
        let Some(document_id) = session.state.document_id().cloned() else {
            return Ok(());
        };
        let batch = OperationBatch::new(document_id, self.config.client_id, operations);

        if session.state.is_offline() {
            self.queue_offline(session, batch);
            return Ok(());
        }
        if !session.state.is_live() {
            return Ok(());
        }

        match self.transport.send_batch(&batch).await {
            Ok(()) => {
                debug!(document = %batch.document_id, operations = batch.len(), "batch sent");
                Ok(())
            }
            Err(e) => {
                warn!(document = %batch.document_id, error = %e, "send failed, going offline");
                self.queue_offline(session, batch);
                let _ = self
                    .dispatch(
                        session,
                        Event::TransportLost {
                            reason: e.to_string(),
                        },
                    )
                    .await;
                Err(e)
            }
        }
    }

    fn queue_offline(&self, session: &mut Session, batch: OperationBatch) {
        let document_id = batch.document_id.clone();
        if let Err(e) = session.outbox.enqueue(batch) {
            warn!(document = %document_id, error = %e, "dropping offline batch");
        }
    }

    // ===========================================
    // Driver loop
    // ===========================================

    /// Receive batches from the transport until shut down.
    ///
    /// While the session is offline with `auto_reconnect` set, the loop
    /// re-joins once the scheduled backoff elapses, whether the session
    /// went offline on a failed join, send or receive. A receive failure
    /// also pauses receiving until the room is re-joined. Returns when
    /// [`SyncClient::shutdown`] is called or the transport closes.
    pub async fn run(&self) -> Result<(), ClientError> {
        let mut retry_at = None;
        loop {
            retry_at = self.next_retry(retry_at).await;

            let wake = tokio::select! {
                _ = self.shutdown.notified() => Wake::Shutdown,
                _ = sleep_until(retry_at) => Wake::Retry,
                received = self.transport.recv_batch() => Wake::Received(received),
            };

            match wake {
                Wake::Shutdown => {
                    info!(client = %self.config.client_name, "sync loop shut down");
                    return Ok(());
                }
                Wake::Retry => {
                    retry_at = None;
                    if let Err(e) = self.reconnect().await {
                        debug!(error = %e, "scheduled reconnect failed");
                    }
                }
                Wake::Received(Ok(batch)) => {
                    self.on_remote_batch(batch).await;
                }
                Wake::Received(Err(TransportError::ConnectionClosed)) => {
                    info!(client = %self.config.client_name, "transport closed");
                    return Ok(());
                }
                Wake::Received(Err(e)) => {
                    warn!(error = %e, "receive failed");
                    self.transport_lost(e.to_string()).await;
                    if !self.config.auto_reconnect {
                        return Err(e.into());
                    }
                    retry_at = None;
                    if self.reconnect_with_backoff().await {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Deadline of the next scheduled reconnect, if the session needs one.
    async fn next_retry(&self, current: Option<Instant>) -> Option<Instant> {
        if !self.config.auto_reconnect {
            return None;
        }
        let mut session = self.session.lock().await;
        if !session.state.is_offline() {
            return None;
        }
        match session.reconnect_delay.take() {
            Some(delay) => Some(Instant::now() + delay),
            None => current,
        }
    }

    async fn transport_lost(&self, reason: String) {
        let mut session = self.session.lock().await;
        let _ = self
            .dispatch(&mut session, Event::TransportLost { reason })
            .await;
    }

    /// Retry until the session is live again (or closed).
    ///
    /// Returns true if shutdown was requested while waiting.
    async fn reconnect_with_backoff(&self) -> bool {
        loop {
            let delay = {
                let mut session = self.session.lock().await;
                if !session.state.is_offline() {
                    return false;
                }
                session.reconnect_delay.take().unwrap_or(IDLE_RETRY)
            };
            debug!(delay_ms = delay.as_millis() as u64, "waiting to reconnect");

            tokio::select! {
                _ = self.shutdown.notified() => return true,
                _ = tokio::time::sleep(delay) => {}
            }

            if self.reconnect().await.is_ok() && self.is_live().await {
                return false;
            }
        }
    }

    // ===========================================
    // Action interpreter
    // ===========================================

    /// Feed an event through the state machine and execute the actions.
    ///
    /// Join outcomes and flush failures are fed back as follow-up events.
    /// Returns the first join or flush error.
    async fn dispatch(&self, session: &mut Session, event: Event) -> Result<(), TransportError> {
        let mut events = VecDeque::from([event]);
        let mut result = Ok(());

        while let Some(event) = events.pop_front() {
            let (next, actions) = std::mem::take(&mut session.state).on_event(event);
            session.state = next;

            for action in actions {
                match action {
                    Action::JoinRoom { document_id } => {
                        match self.transport.join_room(&document_id).await {
                            Ok(()) => events.push_back(Event::Joined),
                            Err(e) => {
                                warn!(document = %document_id, error = %e, "join failed");
                                events.push_back(Event::JoinFailed {
                                    error: e.to_string(),
                                });
                                result = result.and(Err(e));
                            }
                        }
                    }
                    Action::LeaveRoom { document_id } => {
                        if let Err(e) = self.transport.leave_room(&document_id).await {
                            warn!(document = %document_id, error = %e, "leave failed");
                        }
                    }
                    Action::FlushOutbox => {
                        if let Err(e) = self.flush_outbox(session).await {
                            warn!(error = %e, "outbox flush failed");
                            events.push_back(Event::TransportLost {
                                reason: e.to_string(),
                            });
                            result = result.and(Err(e));
                        }
                    }
                    Action::ScheduleReconnect { delay } => {
                        session.reconnect_delay = Some(delay);
                    }
                    Action::EmitEvent(event) => self.emit(event),
                }
            }
        }

        result
    }

    /// Send queued batches oldest first; requeue what could not be sent.
    async fn flush_outbox(&self, session: &mut Session) -> Result<(), TransportError> {
        let mut pending = session.outbox.drain().into_iter();
        while let Some(batch) = pending.next() {
            if let Err(e) = self.transport.send_batch(&batch).await {
                let mut unsent = vec![batch];
                unsent.extend(pending);
                session.outbox.requeue_front(unsent);
                return Err(e);
            }
        }
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        debug!(?event, "session event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // ===========================================
    // Accessors
    // ===========================================

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// The open document, if any.
    pub async fn document_id(&self) -> Option<DocumentId> {
        self.session.lock().await.state.document_id().cloned()
    }

    /// A copy of the buffer content, if a session has its content.
    pub async fn content(&self) -> Option<Content> {
        let session = self.session.lock().await;
        session.buffer.as_ref().map(|b| b.content().clone())
    }

    /// Plain text of the buffer content.
    pub async fn plain_text(&self) -> Option<String> {
        let session = self.session.lock().await;
        session.buffer.as_ref().map(EditBuffer::plain_text)
    }

    /// Check if local changes are currently broadcast.
    pub async fn is_live(&self) -> bool {
        self.session.lock().await.state.is_live()
    }

    /// A copy of the session state.
    pub async fn session_state(&self) -> SessionState {
        self.session.lock().await.state.clone()
    }

    /// Generation of the most recent open.
    pub async fn generation(&self) -> Generation {
        self.session.lock().await.next_generation
    }

    /// Number of batches waiting for a live room.
    pub async fn outbox_len(&self) -> usize {
        self.session.lock().await.outbox.len()
    }

    /// The configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a reference to the document store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
