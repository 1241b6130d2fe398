//! Error types for docsync.

use thiserror::Error;

/// Errors that can occur while building or (de)serializing docsync types.
#[derive(Debug, Error)]
pub enum SyncError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// JSON (de)serialization failed
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A document id was empty
    #[error("document id must not be empty")]
    EmptyDocumentId,

    /// A client id did not parse as a UUID
    #[error("invalid client id: {0}")]
    InvalidClientId(String),
}
