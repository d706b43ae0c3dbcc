//! HTTP vector-search retrieval client.
//!
//! Two round trips per query: embed the query text via an
//! OpenAI-compatible `/embeddings` endpoint, then POST the embedding plus
//! the similarity threshold and result cap to the search service, which
//! returns ranked documents. The core depends only on the `retrieve`
//! contract; this client is one backend behind it.

use async_trait::async_trait;
use heatline_core::error::RetrievalError;
use heatline_core::retrieval::ContextProvider;
use heatline_core::turn::ContextSnippet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::rank::rank;

pub struct VectorSearchClient {
    client: reqwest::Client,
    search_url: String,
    embeddings_url: String,
    embedding_model: String,
    api_key: String,
    threshold: f32,
    top_k: usize,
}

impl VectorSearchClient {
    pub fn new(
        search_url: impl Into<String>,
        embeddings_url: impl Into<String>,
        embedding_model: impl Into<String>,
        api_key: impl Into<String>,
        threshold: f32,
        top_k: usize,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            search_url: search_url.into(),
            embeddings_url: embeddings_url.into().trim_end_matches('/').to_string(),
            embedding_model: embedding_model.into(),
            api_key: api_key.into(),
            threshold,
            top_k,
        }
    }

    /// Embed the query text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let url = format!("{}/embeddings", self.embeddings_url);
        let body = EmbeddingApiRequest {
            model: self.embedding_model.clone(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Backend(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Embedding request failed");
            return Err(RetrievalError::Backend(format!(
                "embeddings endpoint returned status {status}"
            )));
        }

        let parsed: EmbeddingApiResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Backend(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RetrievalError::Backend("embeddings response was empty".into()))
    }
}

#[async_trait]
impl ContextProvider for VectorSearchClient {
    fn name(&self) -> &str {
        "vector_search"
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<ContextSnippet>, RetrievalError> {
        let embedding = self.embed(query).await?;

        let body = SearchApiRequest {
            embedding,
            threshold: self.threshold,
            count: self.top_k,
        };

        let response = self
            .client
            .post(&self.search_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::QueryFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Vector search failed");
            return Err(RetrievalError::QueryFailed(format!(
                "search service returned status {status}"
            )));
        }

        let documents: Vec<SearchApiDocument> = response
            .json()
            .await
            .map_err(|e| RetrievalError::QueryFailed(e.to_string()))?;

        debug!(count = documents.len(), "Vector search returned documents");

        let scored = documents
            .into_iter()
            .map(|d| ContextSnippet::new(d.content, d.similarity))
            .collect();

        // The service already filters, but its config can drift from ours;
        // re-apply threshold and cap locally.
        Ok(rank(scored, self.threshold, self.top_k))
    }
}

// --- Wire types ---

#[derive(Serialize)]
struct EmbeddingApiRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingApiDatum>,
}

#[derive(Deserialize)]
struct EmbeddingApiDatum {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct SearchApiRequest {
    embedding: Vec<f32>,
    threshold: f32,
    count: usize,
}

#[derive(Deserialize)]
struct SearchApiDocument {
    content: String,
    #[serde(default)]
    similarity: f32,
}
