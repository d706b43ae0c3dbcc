//! Turn domain types — the value objects of one question-to-answer cycle.
//!
//! A Turn is created when a user message arrives, accumulates retrieved
//! context and tool invocations while the orchestrator drives it, and is
//! finalized exactly once with the answer handed back to the transport.
//! After finalization it is immutable; the audit sink receives a copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A ranked piece of retrieved domain knowledge used to ground the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnippet {
    /// The snippet text.
    pub content: String,

    /// Relevance score in [0, 1]; snippets arrive relevance-descending.
    pub relevance: f32,
}

impl ContextSnippet {
    pub fn new(content: impl Into<String>, relevance: f32) -> Self {
        Self {
            content: content.into(),
            relevance,
        }
    }
}

/// The terminal result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum InvocationOutcome {
    /// The handler ran and produced a payload.
    Success(String),
    /// Validation, dispatch, or the handler itself failed; the reason is
    /// folded into the aggregated answer instead of aborting the turn.
    Failure(String),
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The payload or failure reason, whichever this outcome carries.
    pub fn text(&self) -> &str {
        match self {
            Self::Success(s) | Self::Failure(s) => s,
        }
    }
}

/// One executed tool call: what was asked, with which arguments, and how
/// it ended. Created when the model requests the call, completed once,
/// never mutated after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Name of the tool the model asked for.
    pub tool_name: String,

    /// Parsed arguments (empty when parsing failed before dispatch).
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,

    /// Terminal result — success payload or failure reason.
    pub outcome: InvocationOutcome,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ToolInvocation {
    /// Record an invocation that failed before its handler could run
    /// (unknown tool, malformed or invalid arguments).
    pub fn rejected(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            tool_name: tool_name.into(),
            arguments: serde_json::Map::new(),
            outcome: InvocationOutcome::Failure(reason.into()),
            started_at: now,
            finished_at: now,
        }
    }
}

/// A single tool call requested by the model, still in wire form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Name of the tool to invoke.
    pub tool_name: String,

    /// Arguments as the raw JSON text the model produced. Parsing and
    /// validation happen in the registry, not here.
    pub raw_arguments: String,
}

/// The completion backend's output: either a literal answer or a list of
/// requested tool calls, consumed exactly once by the orchestrator.
///
/// The model's wording is non-deterministic; orchestrator invariants may
/// depend only on which variant arrived, never on the text inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ModelDecision {
    /// Answer the user directly with this text.
    Direct { text: String },

    /// Execute these tools, in this order, and report on each.
    ToolRequests {
        /// Free text the model emitted alongside the calls, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preamble: Option<String>,
        requests: Vec<ToolRequest>,
    },
}

/// One user-message-to-answer processing cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID.
    pub id: String,

    /// Opaque tenant identifier from the transport.
    pub tenant_id: String,

    /// The user's utterance, verbatim.
    pub user_message: String,

    /// Retrieved knowledge, relevance-descending.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retrieved_context: Vec<ContextSnippet>,

    /// The model's direct answer or preamble text, when it produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_answer: Option<String>,

    /// Executed tool calls, in request order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_invocations: Vec<ToolInvocation>,

    /// The answer handed back to the transport. Set exactly once.
    pub final_answer: String,

    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Start a new turn. `final_answer` stays empty until `finalize`.
    pub fn begin(tenant_id: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            user_message: user_message.into(),
            retrieved_context: Vec::new(),
            model_answer: None,
            tool_invocations: Vec::new(),
            final_answer: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Finalize the turn with its answer. Consumes and returns self so a
    /// finalized turn cannot keep accumulating state.
    pub fn finalize(mut self, answer: impl Into<String>) -> Self {
        self.final_answer = answer.into();
        self
    }

    /// Whether every recorded invocation reached a terminal outcome with a
    /// non-empty tool name. Holds for every finalized turn.
    pub fn invocations_terminal(&self) -> bool {
        self.tool_invocations.iter().all(|inv| !inv.tool_name.is_empty())
    }
}
