//! Print a document.

use anyhow::{Context, Result};
use docsync_client::{DocumentStore, FsStore};

use super::parse_id;

/// Run the show command.
pub async fn run(store: &FsStore, id: &str) -> Result<()> {
    let document_id = parse_id(id)?;
    let document = store
        .fetch_document(&document_id)
        .await
        .with_context(|| format!("Failed to load document {}", document_id))?;

    println!("Title: {}", document.title);
    println!();
    println!("{}", document.content.plain_text());
    Ok(())
}
