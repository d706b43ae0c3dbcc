//! In-memory knowledge base — keyword-overlap retrieval over seeded
//! snippets.
//!
//! Useful for tests, demos, and small deployments where the corpus fits
//! in a config file. Scoring is the fraction of (non-trivial) query terms
//! that appear in the document, which lands in [0, 1] like the vector
//! backend's similarity.

use async_trait::async_trait;
use heatline_core::error::RetrievalError;
use heatline_core::retrieval::ContextProvider;
use heatline_core::turn::ContextSnippet;

use crate::rank::rank;

/// Words too common to signal relevance on their own.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "for", "in", "is", "it", "my", "not", "of", "on", "or", "the", "to",
    "with",
];

/// A read-only, in-process knowledge base. Seeded at construction,
/// safe for unsynchronized concurrent reads afterwards.
pub struct KnowledgeBase {
    documents: Vec<String>,
    threshold: f32,
    top_k: usize,
}

impl KnowledgeBase {
    pub fn new(threshold: f32, top_k: usize) -> Self {
        Self {
            documents: Vec::new(),
            threshold,
            top_k,
        }
    }

    /// Add a document. Insertion order is the tie-break for equal scores.
    pub fn with_document(mut self, content: impl Into<String>) -> Self {
        self.documents.push(content.into());
        self
    }

    /// A starter corpus for the reference HVAC deployment.
    pub fn hvac_starter(threshold: f32, top_k: usize) -> Self {
        Self::new(threshold, top_k)
            .with_document(
                "For heating problems, check the thermostat setting first, then inspect the air \
                 filter. A clogged filter is the most common cause of a furnace not heating.",
            )
            .with_document(
                "For cooling problems, make sure the thermostat is set to COOL and check the air \
                 filter. Dirty coils also reduce cooling capacity.",
            )
            .with_document(
                "Service calls start at $89. Most repairs are completed the same day, and \
                 estimates are free.",
            )
            .with_document(
                "Furnace pilot lights that keep going out usually indicate a dirty or failing \
                 thermocouple. This repair requires a technician.",
            )
            .with_document(
                "Replace standard 1-inch air filters every 90 days, or every 60 days with pets \
                 in the home.",
            )
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 1 && !STOPWORDS.contains(t))
            .map(|t| t.to_string())
            .collect()
    }

    /// Fraction of query terms present in the document.
    fn score(query_terms: &[String], document: &str) -> f32 {
        if query_terms.is_empty() {
            return 0.0;
        }
        let doc = document.to_lowercase();
        let hits = query_terms.iter().filter(|t| doc.contains(t.as_str())).count();
        hits as f32 / query_terms.len() as f32
    }
}

#[async_trait]
impl ContextProvider for KnowledgeBase {
    fn name(&self) -> &str {
        "knowledge_base"
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<ContextSnippet>, RetrievalError> {
        let terms = Self::tokenize(query);

        let scored: Vec<ContextSnippet> = self
            .documents
            .iter()
            .map(|doc| ContextSnippet::new(doc.clone(), Self::score(&terms, doc)))
            .collect();

        Ok(rank(scored, self.threshold, self.top_k))
    }
}
