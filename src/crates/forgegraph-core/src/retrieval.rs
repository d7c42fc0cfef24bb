//! Retrieval collaborator interface.
//!
//! Search backends (vector stores, keyword indexes, web search) plug in
//! behind [`Retriever`]; the corrective-RAG workflow and the research
//! tools node consume it without knowing the backend.

use crate::llm::{CollabResult, CollaboratorError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One ranked retrieval hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub text: String,
    pub source: String,
    pub score: Option<f32>,
}

impl Snippet {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// Render as the `text (Source: …)` line used in prompt contexts.
    pub fn as_context_line(&self) -> String {
        format!("{} (Source: {})", self.text, self.source)
    }
}

/// Ranked snippet search.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` snippets for `query`, best first.
    async fn search(&self, query: &str, top_k: usize) -> CollabResult<Vec<Snippet>>;
}

/// Fixed-corpus retriever for tests and demos: naive substring scoring
/// over an in-memory document list.
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    documents: Vec<Snippet>,
}

impl StaticRetriever {
    pub fn new(documents: Vec<Snippet>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn search(&self, query: &str, top_k: usize) -> CollabResult<Vec<Snippet>> {
        if top_k == 0 {
            return Err(CollaboratorError::Provider("top_k must be positive".into()));
        }

        let query_lower = query.to_lowercase();
        let mut hits: Vec<Snippet> = self
            .documents
            .iter()
            .filter(|doc| doc.text.to_lowercase().contains(&query_lower))
            .cloned()
            .collect();
        hits.truncate(top_k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_retriever_filters_and_truncates() {
        let retriever = StaticRetriever::new(vec![
            Snippet::new("rust ownership rules", "book/ch4"),
            Snippet::new("python decorators", "blog/1"),
            Snippet::new("rust lifetimes", "book/ch10"),
        ]);

        let hits = retriever.search("rust", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "book/ch4");
    }

    #[test]
    fn context_line_format() {
        let snippet = Snippet::new("revenue is net of refunds", "definitions.pdf");
        assert_eq!(
            snippet.as_context_line(),
            "revenue is net of refunds (Source: definitions.pdf)"
        );
    }
}
