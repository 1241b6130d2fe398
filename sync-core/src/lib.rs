//! # sync-core
//!
//! Pure logic for docsync (no I/O, instant tests).
//!
//! This crate implements the edit buffer, the session state machine and the
//! small algorithms around them without any network or disk I/O, enabling
//! fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`EditBuffer`] applies operations to an in-memory document tree
//! - [`SessionState`] turns lifecycle events into a new state plus actions
//! - [`Outbox`] holds batches captured while offline
//!
//! The actual I/O (transport, document store) is performed by `sync-client`,
//! which interprets the actions produced by these state machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod filter;
pub mod outbox;
pub mod state;

pub use buffer::{ApplyError, ApplyFailure, ApplyReport, EditBuffer, LocalChange};
pub use filter::{content_operations, is_selection_only};
pub use outbox::{Outbox, OutboxError};
pub use state::{Action, Event, Generation, SessionEvent, SessionState};
