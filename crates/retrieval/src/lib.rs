//! Knowledge retrieval backends for Heatline.
//!
//! Implements the `ContextProvider` contract three ways:
//! - [`KnowledgeBase`] — in-memory keyword retrieval over seeded snippets
//! - [`VectorSearchClient`] — HTTP embed-then-search against a vector
//!   similarity service
//! - [`NoopProvider`] — always empty

pub mod knowledge_base;
pub mod noop;
pub mod rank;
pub mod vector_client;

pub use knowledge_base::KnowledgeBase;
pub use noop::NoopProvider;
pub use vector_client::VectorSearchClient;

use heatline_core::retrieval::ContextProvider;
use std::sync::Arc;

/// Build the configured retrieval backend.
///
/// `retrieval.backend` selects the implementation; the "memory" backend
/// starts with the HVAC starter corpus. Unknown values are caught by
/// config validation before this runs.
pub fn build_from_config(config: &heatline_config::AppConfig) -> Arc<dyn ContextProvider> {
    let retrieval = &config.retrieval;
    match retrieval.backend.as_str() {
        "vector" => Arc::new(VectorSearchClient::new(
            retrieval.search_url.clone(),
            retrieval.embeddings_url.clone(),
            retrieval.embedding_model.clone(),
            config.completion.api_key.clone().unwrap_or_default(),
            retrieval.threshold,
            retrieval.top_k,
        )),
        "none" => Arc::new(NoopProvider),
        _ => Arc::new(KnowledgeBase::hvac_starter(
            retrieval.threshold,
            retrieval.top_k,
        )),
    }
}
