//! CompletionClient trait — the abstraction over the language-model backend.
//!
//! A CompletionClient sends one structured request (system directive, user
//! message, tool schemas) and returns a [`ModelDecision`]: either a direct
//! answer or a list of requested tool calls. It is the single point of
//! non-determinism in the system — identical inputs may produce different
//! decisions, so callers depend only on the decision's shape.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;
use crate::tool::ToolSpec;
use crate::turn::ModelDecision;

/// One completion request: everything the model sees for this turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System directive: persona plus retrieved knowledge.
    pub system_directive: String,

    /// The user's utterance, verbatim.
    pub user_message: String,

    /// Declared tools the model may request, in registration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_schemas: Vec<ToolSpec>,

    /// Sampling temperature (0.0 = deterministic).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output length in tokens.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_output_tokens() -> u32 {
    1024
}

/// The core CompletionClient trait.
///
/// The orchestrator calls `complete()` without knowing which backend is
/// configured. Implementations must bound the network round trip and
/// surface an expired budget as [`CompletionError::Timeout`].
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai_compat").
    fn name(&self) -> &str;

    /// Send a request and get the model's decision.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<ModelDecision, CompletionError>;
}
