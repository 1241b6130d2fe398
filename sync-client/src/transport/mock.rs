//! Mock transport for testing.
//!
//! Records every call in order, queues inbound batches and injects
//! failures.

use super::{Transport, TransportError};
use async_trait::async_trait;
use docsync_types::{DocumentId, OperationBatch};
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A call made on the mock, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    /// `join_room` (recorded even when it fails).
    Join(DocumentId),
    /// `leave_room`.
    Leave(DocumentId),
    /// A successful `send_batch`.
    Send(OperationBatch),
}

/// Mock transport for testing.
///
/// Clones share state, so a test can keep a handle while the client owns
/// another.
#[derive(Debug, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug)]
struct MockTransportInner {
    connected: bool,
    rooms: BTreeSet<DocumentId>,
    calls: Vec<TransportCall>,
    receive_queue: VecDeque<OperationBatch>,
    fail_next_join: Option<String>,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
    hold_open: bool,
}

impl Default for MockTransportInner {
    fn default() -> Self {
        Self {
            connected: true,
            rooms: BTreeSet::new(),
            calls: Vec::new(),
            receive_queue: VecDeque::new(),
            fail_next_join: None,
            fail_next_send: None,
            fail_next_recv: None,
            hold_open: false,
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a new, connected mock transport.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockTransportInner::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a batch to be returned by the next `recv_batch()` call.
    pub fn queue_batch(&self, batch: OperationBatch) {
        self.lock().receive_queue.push_back(batch);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Batches that were sent successfully, in order.
    pub fn sent_batches(&self) -> Vec<OperationBatch> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::Send(batch) => Some(batch.clone()),
                _ => None,
            })
            .collect()
    }

    /// Rooms currently joined.
    pub fn joined_rooms(&self) -> Vec<DocumentId> {
        self.lock().rooms.iter().cloned().collect()
    }

    /// Simulate the connection dropping (or coming back).
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Cause the next join_room() to fail with the given error.
    pub fn fail_next_join(&self, error: &str) {
        self.lock().fail_next_join = Some(error.to_string());
    }

    /// Cause the next send_batch() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.lock().fail_next_send = Some(error.to_string());
    }

    /// Cause the next recv_batch() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        self.lock().fail_next_recv = Some(error.to_string());
    }

    /// Keep `recv_batch()` waiting once the queue is empty instead of
    /// reporting the connection closed.
    pub fn hold_open(&self, hold: bool) {
        self.lock().hold_open = hold;
    }

    /// Forget recorded calls, keeping rooms and queued batches.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn join_room(&self, document_id: &DocumentId) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(TransportCall::Join(document_id.clone()));

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_join.take() {
            return Err(TransportError::JoinFailed(error));
        }

        inner.rooms.insert(document_id.clone());
        Ok(())
    }

    async fn leave_room(&self, document_id: &DocumentId) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(TransportCall::Leave(document_id.clone()));
        inner.rooms.remove(document_id);
        Ok(())
    }

    async fn send_batch(&self, batch: &OperationBatch) -> Result<(), TransportError> {
        let mut inner = self.lock();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        if !inner.rooms.contains(&batch.document_id) {
            return Err(TransportError::NotInRoom(batch.document_id.clone()));
        }

        inner.calls.push(TransportCall::Send(batch.clone()));
        Ok(())
    }

    async fn recv_batch(&self) -> Result<OperationBatch, TransportError> {
        let (next, hold_open) = {
            let mut inner = self.lock();

            // Check for forced failure
            if let Some(error) = inner.fail_next_recv.take() {
                return Err(TransportError::ReceiveFailed(error));
            }

            (inner.receive_queue.pop_front(), inner.hold_open)
        };

        match next {
            Some(batch) => Ok(batch),
            None if hold_open => std::future::pending().await,
            None => Err(TransportError::ConnectionClosed),
        }
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}
