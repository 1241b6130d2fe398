//! Transport abstraction for docsync.
//!
//! This module provides a pluggable room transport that abstracts the
//! underlying message channel (in-process hub, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and room-oriented:
//! - `join_room()` / `leave_room()` manage membership of a document's room
//! - `send_batch()` delivers a batch to the other members of its room
//! - `recv_batch()` waits for the next batch from another member
//!
//! A transport never hands a client its own batches back.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.join_room(&document_id).await?;
//! transport.send_batch(&batch).await?;
//! let incoming = transport.recv_batch().await?;
//! ```

mod hub;
mod mock;

pub use hub::{HubTransport, LocalHub};
pub use mock::{MockTransport, TransportCall};

use async_trait::async_trait;
use docsync_types::{DocumentId, OperationBatch, SyncError};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Joining a room failed.
    #[error("join failed: {0}")]
    JoinFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// The batch's room has not been joined.
    #[error("not a member of room {0}")]
    NotInRoom(DocumentId),

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// A frame could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] SyncError),
}

/// Transport trait for exchanging operation batches within document rooms.
///
/// Implementations handle the underlying channel (in-process hub,
/// WebSocket, mock, etc). Connection and authentication happen before the
/// transport is handed to a client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Become a member of the document's room.
    async fn join_room(&self, document_id: &DocumentId) -> Result<(), TransportError>;

    /// Stop being a member of the document's room.
    async fn leave_room(&self, document_id: &DocumentId) -> Result<(), TransportError>;

    /// Deliver a batch to every other member of `batch.document_id`'s room.
    async fn send_batch(&self, batch: &OperationBatch) -> Result<(), TransportError>;

    /// Receive the next batch sent by another member of a joined room.
    ///
    /// Blocks until a batch is available or the connection closes.
    async fn recv_batch(&self) -> Result<OperationBatch, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;
}
