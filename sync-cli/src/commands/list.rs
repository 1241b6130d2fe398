//! List stored documents.

use anyhow::{Context, Result};
use docsync_client::FsStore;

/// Run the list command.
pub async fn run(store: &FsStore) -> Result<usize> {
    let documents = store
        .list_documents()
        .await
        .context("Failed to read document store")?;

    if documents.is_empty() {
        println!("No documents in {}", store.dir().display());
        return Ok(0);
    }

    for document in &documents {
        println!("{}  {}", document.id, document.title);
    }
    Ok(documents.len())
}
