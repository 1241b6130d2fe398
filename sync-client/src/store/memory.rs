//! In-memory document store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use docsync_types::{Document, DocumentId};

use super::{DocumentStore, StoreError};

/// In-memory document store.
///
/// Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    documents: HashMap<DocumentId, Document>,
    fail_next_fetch: Option<String>,
    fetches: usize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a document.
    pub fn insert(&self, document: Document) {
        self.lock().documents.insert(document.id.clone(), document);
    }

    /// A copy of a stored document.
    pub fn get(&self, document_id: &DocumentId) -> Option<Document> {
        self.lock().documents.get(document_id).cloned()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    /// Whether the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.lock().documents.is_empty()
    }

    /// Number of `fetch_document` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    /// Cause the next fetch_document() to fail with the given error.
    pub fn fail_next_fetch(&self, error: &str) {
        self.lock().fail_next_fetch = Some(error.to_string());
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch_document(&self, document_id: &DocumentId) -> Result<Document, StoreError> {
        let mut inner = self.lock();
        inner.fetches += 1;

        if let Some(error) = inner.fail_next_fetch.take() {
            return Err(StoreError::Unavailable(error));
        }

        inner
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(document_id.clone()))
    }

    async fn create_document(&self, title: &str) -> Result<Document, StoreError> {
        let document = Document::new(DocumentId::generate(), title);
        self.insert(document.clone());
        Ok(document)
    }
}
