//! Filesystem document store: one pretty-printed JSON file per document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docsync_types::{Document, DocumentId};

use super::{DocumentStore, StoreError};

const EXTENSION: &str = "json";

/// Filesystem document store.
///
/// Documents live at `<dir>/<id>.json`. The directory is created on the
/// first write.
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, document_id: &DocumentId) -> Result<PathBuf, StoreError> {
        let id = document_id.as_str();
        let valid = !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidId(document_id.clone()));
        }
        Ok(self.dir.join(format!("{}.{}", id, EXTENSION)))
    }

    /// Write a document, replacing any previous version.
    pub async fn save_document(&self, document: &Document) -> Result<(), StoreError> {
        let path = self.path_for(&document.id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let contents = serde_json::to_string_pretty(document)?;
        tokio::fs::write(&path, contents).await?;
        Ok(())
    }

    /// Every stored document, ordered by title then id.
    ///
    /// A missing directory is an empty store.
    pub async fn list_documents(&self) -> Result<Vec<Document>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            let contents = tokio::fs::read_to_string(&path).await?;
            documents.push(serde_json::from_str::<Document>(&contents)?);
        }
        documents.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(documents)
    }
}

#[async_trait]
impl DocumentStore for FsStore {
    async fn fetch_document(&self, document_id: &DocumentId) -> Result<Document, StoreError> {
        let path = self.path_for(document_id)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(document_id.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    async fn create_document(&self, title: &str) -> Result<Document, StoreError> {
        let document = Document::new(DocumentId::generate(), title);
        self.save_document(&document).await?;
        Ok(document)
    }
}
