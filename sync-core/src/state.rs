//! Session state machine for docsync.
//!
//! This module provides a pure, side-effect-free state machine for the
//! lifecycle of one client's document session. The state machine takes
//! events as input and produces a new state plus a list of actions to
//! execute.
//!
//! The actual I/O (joining rooms, flushing the outbox) is performed by
//! sync-client, not by this module. This enables instant unit testing
//! without transport mocks.

use std::time::Duration;

use docsync_types::{ClientId, DocumentId};

/// Session generation.
///
/// Bumped on every open. Work started under one generation (a document
/// fetch, say) is discarded if the generation has moved on by the time it
/// completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    /// Create a generation with the given value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The generation after this one.
    pub const fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No document open.
    Closed,
    /// Document chosen, waiting for content and the room join.
    Opening {
        /// The document being opened.
        document_id: DocumentId,
        /// Generation of this session.
        generation: Generation,
    },
    /// Member of the document's room; local changes are broadcast.
    Live {
        /// The open document.
        document_id: DocumentId,
        /// Generation of this session.
        generation: Generation,
    },
    /// Room membership lost; local changes go to the outbox.
    Offline {
        /// The open document.
        document_id: DocumentId,
        /// Generation of this session.
        generation: Generation,
        /// Number of failed join attempts so far.
        attempt: u32,
    },
}

impl SessionState {
    /// Create a new state machine in the Closed state.
    pub fn new() -> Self {
        Self::Closed
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (sync-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // Any state: tear down the old session first
            (
                old,
                Event::OpenRequested {
                    document_id,
                    generation,
                },
            ) => {
                let mut actions = Vec::new();
                if let Self::Live {
                    document_id: old_id,
                    ..
                }
                | Self::Offline {
                    document_id: old_id,
                    ..
                } = old
                {
                    actions.push(Action::LeaveRoom {
                        document_id: old_id.clone(),
                    });
                    actions.push(Action::EmitEvent(SessionEvent::Closed {
                        document_id: old_id,
                    }));
                }
                (
                    Self::Opening {
                        document_id,
                        generation,
                    },
                    actions,
                )
            }

            // From Opening
            (
                Self::Opening {
                    document_id,
                    generation,
                },
                Event::ContentReady { generation: ready },
            ) if ready == generation => (
                Self::Opening {
                    document_id: document_id.clone(),
                    generation,
                },
                vec![Action::JoinRoom { document_id }],
            ),
            (
                Self::Opening {
                    document_id,
                    generation,
                },
                Event::Joined,
            ) => (
                Self::Live {
                    document_id: document_id.clone(),
                    generation,
                },
                vec![
                    Action::FlushOutbox,
                    Action::EmitEvent(SessionEvent::Opened { document_id }),
                ],
            ),
            (
                Self::Opening {
                    document_id,
                    generation,
                },
                Event::JoinFailed { error },
            ) => go_offline(document_id, generation, error),
            (Self::Opening { document_id, .. }, Event::CloseRequested) => (
                Self::Closed,
                vec![Action::EmitEvent(SessionEvent::Closed { document_id })],
            ),

            // From Live
            (
                Self::Live {
                    document_id,
                    generation,
                },
                Event::TransportLost { reason },
            ) => go_offline(document_id, generation, reason),

            // From Offline
            (
                Self::Offline {
                    document_id,
                    generation,
                    attempt,
                },
                Event::ReconnectRequested,
            ) => (
                Self::Offline {
                    document_id: document_id.clone(),
                    generation,
                    attempt,
                },
                vec![Action::JoinRoom { document_id }],
            ),
            (
                Self::Offline {
                    document_id,
                    generation,
                    ..
                },
                Event::Joined,
            ) => (
                Self::Live {
                    document_id: document_id.clone(),
                    generation,
                },
                vec![
                    Action::FlushOutbox,
                    Action::EmitEvent(SessionEvent::Reconnected { document_id }),
                ],
            ),
            (
                Self::Offline {
                    document_id,
                    generation,
                    attempt,
                },
                Event::JoinFailed { error },
            ) => {
                let next_attempt = attempt.saturating_add(1);
                (
                    Self::Offline {
                        document_id: document_id.clone(),
                        generation,
                        attempt: next_attempt,
                    },
                    vec![
                        Action::EmitEvent(SessionEvent::ReconnectFailed {
                            document_id,
                            attempt: next_attempt,
                            error,
                        }),
                        Action::ScheduleReconnect {
                            delay: calculate_backoff(next_attempt),
                        },
                    ],
                )
            }

            // From Live or Offline
            (Self::Live { document_id, .. }, Event::CloseRequested)
            | (Self::Offline { document_id, .. }, Event::CloseRequested) => (
                Self::Closed,
                vec![
                    Action::LeaveRoom {
                        document_id: document_id.clone(),
                    },
                    Action::EmitEvent(SessionEvent::Closed { document_id }),
                ],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// The open document, if any.
    pub fn document_id(&self) -> Option<&DocumentId> {
        match self {
            Self::Closed => None,
            Self::Opening { document_id, .. }
            | Self::Live { document_id, .. }
            | Self::Offline { document_id, .. } => Some(document_id),
        }
    }

    /// Generation of the current session, if any.
    pub fn generation(&self) -> Option<Generation> {
        match self {
            Self::Closed => None,
            Self::Opening { generation, .. }
            | Self::Live { generation, .. }
            | Self::Offline { generation, .. } => Some(*generation),
        }
    }

    /// Check if local changes are currently broadcast.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    /// Check if the session lost its room membership.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline { .. })
    }

    /// Check if a session exists and has its content (Live or Offline).
    pub fn is_open(&self) -> bool {
        self.is_live() || self.is_offline()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

fn go_offline(
    document_id: DocumentId,
    generation: Generation,
    error: String,
) -> (SessionState, Vec<Action>) {
    (
        SessionState::Offline {
            document_id: document_id.clone(),
            generation,
            attempt: 1,
        },
        vec![
            Action::EmitEvent(SessionEvent::ConnectionLost { document_id, error }),
            Action::ScheduleReconnect {
                delay: calculate_backoff(1),
            },
        ],
    )
}

/// Events that can occur in the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Caller asked to open a document.
    OpenRequested {
        /// The document to open.
        document_id: DocumentId,
        /// Generation of the new session.
        generation: Generation,
    },
    /// Initial content installed in the buffer.
    ContentReady {
        /// Generation the content was loaded under.
        generation: Generation,
    },
    /// Room join acknowledged.
    Joined,
    /// Room join failed.
    JoinFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Transport failed while live.
    TransportLost {
        /// Reason for the loss.
        reason: String,
    },
    /// Reconnect delay elapsed (or caller asked to reconnect).
    ReconnectRequested,
    /// Caller asked to close the session.
    CloseRequested,
}

/// Actions to be executed by the sync-client.
///
/// These are instructions, not side effects. The sync-client interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Join the document's room.
    JoinRoom {
        /// Room to join.
        document_id: DocumentId,
    },
    /// Leave the document's room.
    LeaveRoom {
        /// Room to leave.
        document_id: DocumentId,
    },
    /// Send queued offline batches, oldest first.
    FlushOutbox,
    /// Try joining again after a delay.
    ScheduleReconnect {
        /// Delay before the next attempt.
        delay: Duration,
    },
    /// Emit an event to the application.
    EmitEvent(SessionEvent),
}

/// Events emitted to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session is live in the document's room.
    Opened {
        /// The open document.
        document_id: DocumentId,
    },
    /// Session was closed or replaced.
    Closed {
        /// The closed document.
        document_id: DocumentId,
    },
    /// Room membership was lost; editing continues offline.
    ConnectionLost {
        /// The affected document.
        document_id: DocumentId,
        /// Error message describing the failure.
        error: String,
    },
    /// Room re-joined after an outage.
    Reconnected {
        /// The open document.
        document_id: DocumentId,
    },
    /// Reconnection attempt failed.
    ReconnectFailed {
        /// The affected document.
        document_id: DocumentId,
        /// Which reconnection attempt this was.
        attempt: u32,
        /// Error message describing the failure.
        error: String,
    },
    /// A peer's batch was applied to the buffer.
    RemoteApplied {
        /// The open document.
        document_id: DocumentId,
        /// The peer that sent the batch.
        origin: ClientId,
        /// Operations applied.
        applied: usize,
        /// Operations skipped because they failed.
        failed: usize,
    },
}

/// Calculate reconnection backoff with jitter.
///
/// Uses exponential backoff with random jitter so that a room full of
/// clients does not re-join in lockstep after a transport restart.
///
/// Formula: min(30s, 2^attempt seconds) + random(0..5000ms)
fn calculate_backoff(attempt: u32) -> Duration {
    // Base: 2^attempt seconds, capped at 30 seconds
    let base_secs = 2u64.pow(attempt.min(5)).min(30);
    let base = Duration::from_secs(base_secs);

    base + Duration::from_millis(random_jitter_ms())
}

/// Random jitter between 0 and 5000 milliseconds (0 if no entropy).
fn random_jitter_ms() -> u64 {
    let mut bytes = [0u8; 8];
    if getrandom::getrandom(&mut bytes).is_err() {
        return 0;
    }
    u64::from_le_bytes(bytes) % 5001
}
