//! File-based turn log — append-only JSON-lines storage.
//!
//! One JSON-encoded `Turn` per line. Simple, portable, human-inspectable,
//! and requires zero external dependencies. Corrupted lines are skipped
//! on read rather than poisoning the whole file.

use async_trait::async_trait;
use heatline_core::audit::TurnLogger;
use heatline_core::error::AuditError;
use heatline_core::turn::Turn;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A file-backed turn log using JSONL (one JSON object per line).
///
/// Writes append under a mutex so concurrent turns cannot interleave
/// partial lines.
pub struct JsonlTurnLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlTurnLog {
    /// Create a new JSONL log at the given path. The file (and parent
    /// directory) are created on first write.
    pub fn new(path: PathBuf) -> Self {
        debug!(path = %path.display(), "JSONL turn log configured");
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Read all turns back from disk, skipping corrupted lines.
    /// Used by diagnostics and tests; the orchestrator never reads back.
    pub fn load(&self) -> Vec<Turn> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Turn>(line) {
                Ok(turn) => Some(turn),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted turn record");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl TurnLogger for JsonlTurnLog {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn record(&self, turn: Turn) -> Result<(), AuditError> {
        let line = serde_json::to_string(&turn)
            .map_err(|e| AuditError::Sink(format!("Failed to serialize turn: {e}")))?;

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AuditError::Sink(format!("Failed to create audit directory: {e}"))
                })?;
            }
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AuditError::Sink(format!("Failed to open audit file: {e}")))?;

        writeln!(file, "{line}")
            .map_err(|e| AuditError::Sink(format!("Failed to write turn record: {e}")))?;

        Ok(())
    }
}
