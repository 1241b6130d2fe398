//! # sync-types
//!
//! Wire format and document model types for docsync.
//!
//! This crate provides the foundational types used across all docsync crates:
//! - [`DocumentId`], [`ClientId`] - Identity types
//! - [`Content`], [`Node`], [`Document`] - The rich-text document tree
//! - [`Operation`], [`OperationBatch`] - Content mutations exchanged between peers
//! - [`Message`] - Frames carried by a room transport
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod content;
mod error;
mod ids;
mod messages;
mod operation;

pub use content::{Content, Document, Element, Node, Properties, Text, DEFAULT_BLOCK};
pub use error::SyncError;
pub use ids::{ClientId, DocumentId};
pub use messages::{Message, RoomPeer};
pub use operation::{Operation, OperationBatch, Path};
