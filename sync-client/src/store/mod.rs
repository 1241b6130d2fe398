//! Document store abstraction for docsync.
//!
//! The store is consulted when a session starts (fetch) and when a document
//! is created; the sync core never writes edits back. When and how edited
//! content is persisted is the store's own business.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use docsync_types::{Document, DocumentId};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document with this id.
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// The id cannot be used as a storage key.
    #[error("invalid document id for this store: {0}")]
    InvalidId(DocumentId),

    /// The backing storage failed.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be parsed or written.
    #[error("malformed document: {0}")]
    Format(#[from] serde_json::Error),

    /// The store is temporarily unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Document store trait.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document's title and content.
    async fn fetch_document(&self, document_id: &DocumentId) -> Result<Document, StoreError>;

    /// Create a new document with a fresh id and a single empty paragraph.
    async fn create_document(&self, title: &str) -> Result<Document, StoreError>;
}
