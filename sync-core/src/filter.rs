//! Selection filtering.
//!
//! Cursor and selection moves are local to each client. Before a change
//! notification is turned into a batch for the room, the selection-only
//! operations are dropped; a change made of nothing else produces no batch.

use docsync_types::Operation;

/// The operations of a change that mutate content, in their original order.
pub fn content_operations(operations: &[Operation]) -> Vec<Operation> {
    operations
        .iter()
        .filter(|op| op.mutates_content())
        .cloned()
        .collect()
}

/// Whether a change only moved the cursor or selection.
///
/// An empty change counts as selection-only: there is nothing to broadcast.
pub fn is_selection_only(operations: &[Operation]) -> bool {
    operations.iter().all(Operation::is_selection_only)
}
