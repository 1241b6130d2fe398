//! Outbox for batches captured while offline.
//!
//! Local edits keep flowing into the edit buffer while the transport is
//! down. Their batches wait here until the room has been re-joined, then
//! go out in the order they were produced:
//! 1. `enqueue()` - add to the back of the queue
//! 2. `drain()` - take everything for sending
//! 3. `requeue_front()` - put back what could not be sent
//!
//! The outbox is bounded to prevent unbounded memory growth during a long
//! outage.

use std::collections::VecDeque;
use docsync_types::OperationBatch;

/// Error type for outbox operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboxError {
    /// Outbox is at capacity.
    Full {
        /// Current outbox capacity.
        capacity: usize,
    },
}

impl std::fmt::Display for OutboxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutboxError::Full { capacity } => {
                write!(f, "outbox full (capacity: {})", capacity)
            }
        }
    }
}

impl std::error::Error for OutboxError {}

/// Bounded FIFO of batches waiting for a live room.
#[derive(Debug)]
pub struct Outbox {
    /// Maximum number of batches.
    max_size: usize,
    /// Batches waiting to be sent.
    queue: VecDeque<OperationBatch>,
}

impl Outbox {
    /// Create a new outbox with the given maximum size.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            queue: VecDeque::new(),
        }
    }

    /// Add a batch to the back of the queue.
    ///
    /// Returns an error if the outbox is full.
    pub fn enqueue(&mut self, batch: OperationBatch) -> Result<(), OutboxError> {
        if self.queue.len() >= self.max_size {
            return Err(OutboxError::Full {
                capacity: self.max_size,
            });
        }
        self.queue.push_back(batch);
        Ok(())
    }

    /// Take every queued batch, oldest first.
    pub fn drain(&mut self) -> Vec<OperationBatch> {
        self.queue.drain(..).collect()
    }

    /// Put unsent batches back at the front, keeping their order.
    ///
    /// Used when a flush fails part-way. Requeued batches may exceed the
    /// capacity; they were already accepted once.
    pub fn requeue_front(&mut self, batches: Vec<OperationBatch>) {
        for batch in batches.into_iter().rev() {
            self.queue.push_front(batch);
        }
    }

    /// Number of queued batches.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if the outbox is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Maximum number of batches.
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Total number of queued operations across all batches.
    pub fn operation_count(&self) -> usize {
        self.queue.iter().map(OperationBatch::len).sum()
    }

    /// Drop every queued batch.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
