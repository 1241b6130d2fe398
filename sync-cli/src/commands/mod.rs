//! CLI command implementations.

pub mod apply;
pub mod create;
pub mod demo;
pub mod list;
pub mod show;

use anyhow::{Context, Result};
use docsync_types::DocumentId;

/// Parse a document id given on the command line.
pub(crate) fn parse_id(id: &str) -> Result<DocumentId> {
    DocumentId::new(id).with_context(|| format!("Invalid document id '{}'", id))
}
