//! Language-model completion backends for Heatline.
//!
//! One production implementation of the `CompletionClient` contract:
//! an OpenAI-compatible chat-completions client with function calling.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatClient;
