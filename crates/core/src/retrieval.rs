//! ContextProvider trait — the abstraction over knowledge retrieval.
//!
//! Given a query, a provider returns zero or more ranked snippets above a
//! relevance threshold, capped at a configured top-K. Zero results is a
//! normal outcome, not an error; a provider failure is recoverable and the
//! caller degrades to an empty context.

use async_trait::async_trait;

use crate::error::RetrievalError;
use crate::turn::ContextSnippet;

/// The core ContextProvider trait.
///
/// Implementations: in-memory knowledge base, HTTP vector search, none.
/// Results must come back relevance-descending, ties broken by insertion
/// order, so identical inputs rank identically.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// The provider name (e.g., "knowledge_base", "vector_search", "none").
    fn name(&self) -> &str;

    /// Retrieve ranked snippets for the query.
    async fn retrieve(
        &self,
        query: &str,
    ) -> std::result::Result<Vec<ContextSnippet>, RetrievalError>;
}
