//! Ranking utilities shared by retrieval backends.

use heatline_core::ContextSnippet;

/// Apply the relevance threshold and top-K cap to scored snippets and
/// return them relevance-descending.
///
/// The sort is stable, so snippets with equal scores keep their input
/// (insertion) order — identical inputs always rank identically.
pub fn rank(mut scored: Vec<ContextSnippet>, threshold: f32, top_k: usize) -> Vec<ContextSnippet> {
    scored.retain(|s| s.relevance >= threshold);
    scored.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}
