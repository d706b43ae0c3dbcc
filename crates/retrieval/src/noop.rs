//! No-op retrieval — always empty. For deployments that answer from the
//! model alone.

use async_trait::async_trait;
use heatline_core::error::RetrievalError;
use heatline_core::retrieval::ContextProvider;
use heatline_core::turn::ContextSnippet;

pub struct NoopProvider;

#[async_trait]
impl ContextProvider for NoopProvider {
    fn name(&self) -> &str {
        "none"
    }

    async fn retrieve(&self, _query: &str) -> Result<Vec<ContextSnippet>, RetrievalError> {
        Ok(Vec::new())
    }
}
