//! Frames carried by a room transport.
//!
//! Frames are encoded as MessagePack with named fields so that the
//! free-form node properties survive the trip unchanged.

use serde::{Deserialize, Serialize};

use crate::{ClientId, DocumentId, OperationBatch, SyncError};

/// All frames a room transport delivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Operations from another room member
    Batch(OperationBatch),
    /// A client joined the room
    PeerJoined(RoomPeer),
    /// A client left the room
    PeerLeft(RoomPeer),
}

impl Message {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SyncError> {
        rmp_serde::to_vec_named(self).map_err(SyncError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SyncError> {
        rmp_serde::from_slice(bytes).map_err(SyncError::Deserialization)
    }

    /// The room this frame belongs to.
    pub fn document_id(&self) -> &DocumentId {
        match self {
            Message::Batch(batch) => &batch.document_id,
            Message::PeerJoined(peer) | Message::PeerLeft(peer) => &peer.document_id,
        }
    }
}

/// Room membership change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPeer {
    /// Room (document) id
    pub document_id: DocumentId,
    /// The client that joined or left
    pub client_id: ClientId,
}
