//! Content operations and operation batches.
//!
//! Operations use the rich-text editor's JSON shape, tagged by `type`:
//!
//! ```json
//! {"type": "insert_text", "path": [0, 0], "offset": 5, "text": " world"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ClientId, DocumentId, Node, Properties};

/// Child indices from the root of the content tree.
pub type Path = Vec<usize>;

/// A single serializable mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Insert `text` into the leaf at `path`, starting at `offset`.
    InsertText {
        /// Leaf path.
        path: Path,
        /// Character offset.
        offset: usize,
        /// Inserted text.
        text: String,
    },
    /// Remove `text` from the leaf at `path`, starting at `offset`.
    RemoveText {
        /// Leaf path.
        path: Path,
        /// Character offset.
        offset: usize,
        /// Removed text.
        text: String,
    },
    /// Insert `node` so that it ends up at `path`.
    InsertNode {
        /// Target path.
        path: Path,
        /// Inserted node.
        node: Node,
    },
    /// Remove the node at `path`.
    RemoveNode {
        /// Removed path.
        path: Path,
        /// The node as it was when removed.
        node: Node,
    },
    /// Split the node at `path` at `position`; the tail becomes the next sibling.
    SplitNode {
        /// Split node path.
        path: Path,
        /// Character offset (text) or child index (element).
        position: usize,
        /// Properties applied to the new sibling.
        #[serde(default)]
        properties: Properties,
    },
    /// Merge the node at `path` into its previous sibling.
    MergeNode {
        /// Merged node path.
        path: Path,
        /// Length of the previous sibling before the merge.
        position: usize,
        /// Properties of the merged node.
        #[serde(default)]
        properties: Properties,
    },
    /// Move the node at `path` so that it ends up at `new_path`.
    MoveNode {
        /// Source path.
        path: Path,
        /// Destination path.
        #[serde(rename = "newPath", alias = "new_path")]
        new_path: Path,
    },
    /// Set properties (or marks) on the node at `path`. `null` removes a key.
    SetNode {
        /// Node path.
        path: Path,
        /// Previous values.
        #[serde(default)]
        properties: Properties,
        /// New values.
        #[serde(default, rename = "newProperties", alias = "new_properties")]
        new_properties: Properties,
    },
    /// Move the cursor or change the selection. Never mutates content.
    SetSelection {
        /// Previous selection.
        #[serde(default)]
        properties: Option<Value>,
        /// New selection.
        #[serde(default, rename = "newProperties", alias = "new_properties")]
        new_properties: Option<Value>,
    },
}

impl Operation {
    /// Build an `insert_text` operation.
    pub fn insert_text(path: impl Into<Path>, offset: usize, text: impl Into<String>) -> Self {
        Operation::InsertText {
            path: path.into(),
            offset,
            text: text.into(),
        }
    }

    /// Build a `remove_text` operation.
    pub fn remove_text(path: impl Into<Path>, offset: usize, text: impl Into<String>) -> Self {
        Operation::RemoveText {
            path: path.into(),
            offset,
            text: text.into(),
        }
    }

    /// Build a `set_selection` operation.
    pub fn set_selection(properties: Option<Value>, new_properties: Option<Value>) -> Self {
        Operation::SetSelection {
            properties,
            new_properties,
        }
    }

    /// Whether this operation only moves the cursor or selection.
    pub fn is_selection_only(&self) -> bool {
        matches!(self, Operation::SetSelection { .. })
    }

    /// Whether this operation changes the content tree.
    pub fn mutates_content(&self) -> bool {
        !self.is_selection_only()
    }

    /// The path this operation targets, if any.
    pub fn path(&self) -> Option<&[usize]> {
        match self {
            Operation::InsertText { path, .. }
            | Operation::RemoveText { path, .. }
            | Operation::InsertNode { path, .. }
            | Operation::RemoveNode { path, .. }
            | Operation::SplitNode { path, .. }
            | Operation::MergeNode { path, .. }
            | Operation::MoveNode { path, .. }
            | Operation::SetNode { path, .. } => Some(path),
            Operation::SetSelection { .. } => None,
        }
    }

    /// The wire name of this operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::InsertText { .. } => "insert_text",
            Operation::RemoveText { .. } => "remove_text",
            Operation::InsertNode { .. } => "insert_node",
            Operation::RemoveNode { .. } => "remove_node",
            Operation::SplitNode { .. } => "split_node",
            Operation::MergeNode { .. } => "merge_node",
            Operation::MoveNode { .. } => "move_node",
            Operation::SetNode { .. } => "set_node",
            Operation::SetSelection { .. } => "set_selection",
        }
    }
}

/// Ordered operations produced by one local change event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationBatch {
    /// The document the operations belong to.
    pub document_id: DocumentId,
    /// The client that produced them.
    pub origin: ClientId,
    /// Operations, in application order.
    pub operations: Vec<Operation>,
}

impl OperationBatch {
    /// Create a new batch.
    pub fn new(document_id: DocumentId, origin: ClientId, operations: Vec<Operation>) -> Self {
        Self {
            document_id,
            origin,
            operations,
        }
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the batch carries no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
