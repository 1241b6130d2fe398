//! # sync-client
//!
//! Synchronization core for docsync real-time collaborative editing.
//!
//! This is the main library that editing applications use to keep a
//! document consistent across every client viewing it.
//!
//! ## Features
//!
//! - **Room Broadcast**: local content operations go to every other member
//!   of the document's room as one batch per change
//! - **Echo Suppression**: remote batches are applied without being sent back
//! - **Offline Outbox**: edits made while the room is unreachable are flushed
//!   in order once it is re-joined
//! - **Transport Abstraction**: pluggable transport layer (in-process hub, mock)
//! - **Pure State Machine**: Uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use docsync_client::{FsStore, LocalHub, SyncClient, SyncConfig};
//!
//! let hub = LocalHub::new();
//! let client = SyncClient::new(SyncConfig::default(), hub.connect(), FsStore::new("docs"));
//!
//! // Fetch the document and join its room
//! let document = client.open_document(document_id).await?;
//!
//! // Forward editor changes
//! client.on_local_change(snapshot, operations).await?;
//!
//! // Apply peers' batches until shutdown
//! client.run().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod store;
pub mod transport;

pub use client::{ClientError, SyncClient, SyncConfig};
pub use docsync_core::{ApplyReport, SessionEvent, SessionState};
pub use store::{DocumentStore, FsStore, MemoryStore, StoreError};
pub use transport::{HubTransport, LocalHub, MockTransport, Transport, TransportCall, TransportError};
