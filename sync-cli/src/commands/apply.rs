//! Apply an operation file to a stored document.
//!
//! The operations are delivered to a session on the document exactly as a
//! batch from another room member would be, so failures are skipped and
//! reported the same way.

use anyhow::{Context, Result};
use docsync_client::{ApplyReport, FsStore, MockTransport, SyncClient};
use docsync_types::{ClientId, Operation, OperationBatch};
use std::path::Path;

use super::parse_id;
use crate::config::Config;

/// Run the apply command.
pub async fn run(store: &FsStore, config: &Config, id: &str, ops: &Path) -> Result<ApplyReport> {
    let document_id = parse_id(id)?;

    let contents = tokio::fs::read_to_string(ops)
        .await
        .with_context(|| format!("Failed to read {}", ops.display()))?;
    let operations: Vec<Operation> =
        serde_json::from_str(&contents).context("Invalid operation list")?;

    let client = SyncClient::new(config.sync_config(), MockTransport::new(), store.clone());
    let document = client
        .open_document(document_id.clone())
        .await
        .with_context(|| format!("Failed to open document {}", document_id))?;

    let batch = OperationBatch::new(document_id, ClientId::new(), operations);
    let report = client.on_remote_batch(batch).await;

    let content = client
        .content()
        .await
        .context("Session closed while applying")?;
    client.close_session().await;

    store
        .save_document(&document.with_content(content))
        .await
        .context("Failed to save document")?;

    println!(
        "Applied {} operation(s), {} failed",
        report.applied,
        report.failed()
    );
    for failure in &report.failures {
        println!("  #{} {}: {}", failure.index, failure.operation, failure.error);
    }
    Ok(report)
}
