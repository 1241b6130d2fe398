//! Create a document.

use anyhow::{Context, Result};
use docsync_client::{DocumentStore, FsStore};
use docsync_types::DocumentId;

/// Run the create command.
pub async fn run(store: &FsStore, title: &str) -> Result<DocumentId> {
    let document = store
        .create_document(title)
        .await
        .context("Failed to create document")?;

    println!("{}", document.id);
    Ok(document.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn create_writes_empty_document() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path());

        let id = run(&store, "Notes").await.unwrap();

        let stored = store.fetch_document(&id).await.unwrap();
        assert_eq!(stored.title, "Notes");
        assert_eq!(stored.content.plain_text(), "");
    }

    #[tokio::test]
    async fn create_twice_gives_distinct_ids() {
        let dir = tempdir().unwrap();
        let store = FsStore::new(dir.path());

        let first = run(&store, "Same").await.unwrap();
        let second = run(&store, "Same").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.list_documents().await.unwrap().len(), 2);
    }
}
