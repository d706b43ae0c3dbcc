//! Turn audit sinks for Heatline.
//!
//! Implements the `TurnLogger` contract three ways:
//! - [`JsonlTurnLog`] — append-only JSON-lines file
//! - [`InMemoryTurnLog`] — Vec-backed, for tests
//! - [`NoopTurnLog`] — discards everything

pub mod in_memory;
pub mod jsonl;
pub mod noop;

pub use in_memory::InMemoryTurnLog;
pub use jsonl::JsonlTurnLog;
pub use noop::NoopTurnLog;

use heatline_core::audit::TurnLogger;
use std::sync::Arc;

/// Build the configured audit sink. Unknown values are caught by config
/// validation before this runs.
pub fn build_from_config(config: &heatline_config::AuditConfig) -> Arc<dyn TurnLogger> {
    match config.sink.as_str() {
        "memory" => Arc::new(InMemoryTurnLog::new()),
        "none" => Arc::new(NoopTurnLog),
        _ => Arc::new(JsonlTurnLog::new(config.path.clone().into())),
    }
}
