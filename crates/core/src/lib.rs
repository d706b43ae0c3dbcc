//! # Heatline Core
//!
//! Domain types, traits, and error definitions for the Heatline
//! conversational backend. This crate has **zero framework dependencies**
//! — it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here: retrieval,
//! completion, tool handlers, audit. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod audit;
pub mod completion;
pub mod error;
pub mod retrieval;
pub mod tool;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use audit::TurnLogger;
pub use completion::{CompletionClient, CompletionRequest};
pub use error::{AuditError, CompletionError, Error, Result, RetrievalError, ToolError};
pub use retrieval::ContextProvider;
pub use tool::{ParamKind, ParamSpec, ToolHandler, ToolRegistry, ToolSpec};
pub use turn::{
    ContextSnippet, InvocationOutcome, ModelDecision, ToolInvocation, ToolRequest, Turn,
};
