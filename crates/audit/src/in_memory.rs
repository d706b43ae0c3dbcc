//! In-memory turn log — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use heatline_core::audit::TurnLogger;
use heatline_core::error::AuditError;
use heatline_core::turn::Turn;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory sink that stores turns in a Vec.
pub struct InMemoryTurnLog {
    turns: Arc<RwLock<Vec<Turn>>>,
}

impl InMemoryTurnLog {
    pub fn new() -> Self {
        Self {
            turns: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn count(&self) -> usize {
        self.turns.read().await.len()
    }

    pub async fn turns(&self) -> Vec<Turn> {
        self.turns.read().await.clone()
    }
}

impl Default for InMemoryTurnLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TurnLogger for InMemoryTurnLog {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn record(&self, turn: Turn) -> Result<(), AuditError> {
        self.turns.write().await.push(turn);
        Ok(())
    }
}
