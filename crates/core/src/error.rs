//! Error types for the Heatline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! The propagation policy is degrade-not-fail: below the transport
//! boundary, every one of these errors has a defined textual fallback and
//! none of them may leave a turn without a final answer.

use thiserror::Error;

/// The top-level error type for all Heatline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Completion errors ---
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Audit errors ---
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures while fetching knowledge snippets. Always recoverable: the
/// orchestrator degrades to an empty context and keeps going.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Retrieval backend unavailable: {0}")]
    Backend(String),

    #[error("Retrieval timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Failures while consulting the completion backend.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("Completion timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Rate limited by completion backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures in tool registration, validation, and dispatch.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool already registered: {0}")]
    Duplicate(String),

    #[error("Unknown tool: {0}")]
    Unknown(String),

    #[error("Tool arguments are not well-formed: {0}")]
    ArgumentParse(String),

    #[error("Invalid arguments for {tool_name}: {reason}")]
    Validation { tool_name: String, reason: String },

    #[error("Tool execution failed: {tool_name} — {reason}")]
    HandlerFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },
}

/// Failures while persisting a completed turn. Recorded, never surfaced.
#[derive(Debug, Clone, Error)]
pub enum AuditError {
    #[error("Audit sink error: {0}")]
    Sink(String),
}
