//! TurnLogger trait — the audit sink for completed turns.
//!
//! The orchestrator emits one finalized [`Turn`] per completed turn and
//! never reads it back. Logging is fire-and-forget: a sink failure is
//! recorded, never surfaced to the caller, and never delays the response.

use async_trait::async_trait;

use crate::error::AuditError;
use crate::turn::Turn;

/// The core TurnLogger trait.
///
/// Implementations: JSONL file, in-memory (tests), none.
#[async_trait]
pub trait TurnLogger: Send + Sync {
    /// The sink name (e.g., "jsonl", "in_memory", "none").
    fn name(&self) -> &str;

    /// Persist one finalized turn. Takes the turn by value — the caller
    /// hands over a copy and retains no reference.
    async fn record(&self, turn: Turn) -> std::result::Result<(), AuditError>;
}
