//! No-op turn log — discards every record.

use async_trait::async_trait;
use heatline_core::audit::TurnLogger;
use heatline_core::error::AuditError;
use heatline_core::turn::Turn;

pub struct NoopTurnLog;

#[async_trait]
impl TurnLogger for NoopTurnLog {
    fn name(&self) -> &str {
        "none"
    }

    async fn record(&self, _turn: Turn) -> Result<(), AuditError> {
        Ok(())
    }
}
