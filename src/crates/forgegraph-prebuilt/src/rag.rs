//! Corrective retrieval-augmented generation.
//!
//! ```text
//! retrieve ──▶ grade ──(all filtered, rewrites left)──▶ transform_query ──▶ retrieve
//!                │
//!                ▼ (relevant docs, or rewrite ceiling reached)
//!             generate ──▶ END
//! ```
//!
//! Retrieved documents are individually graded for relevance before
//! generation; when everything is filtered out the query is rewritten and
//! retrieval retried. The `retry_count` channel caps the self-correction
//! loop: once the ceiling is reached the workflow generates anyway, even
//! with zero relevant documents, rather than loop forever.
//!
//! A failed grading call keeps the document instead of failing the run:
//! losing one noisy document beats losing the answer.

use crate::error::Result;
use forgegraph_core::{
    ChatModel, CompiledGraph, GenerateRequest, MergePolicy, Retriever, StateGraph, END,
};
use serde_json::{json, Value};
use std::sync::Arc;

const GRADER_SYSTEM: &str = "You are a grader assessing the relevance of a retrieved document to \
    a user question. If the document contains keywords or semantic meaning related to the \
    question, it is relevant. Answer strictly 'yes' or 'no'.";

const REWRITE_SYSTEM: &str = "Look at the question and reason about its underlying semantic \
    intent. Formulate an improved question that will retrieve better documents. Reply with the \
    improved question only.";

const GENERATE_SYSTEM: &str = "You are an assistant for question-answering tasks. Use the \
    retrieved context to answer the question. If you don't know the answer, say that you don't \
    know. Use three sentences maximum and keep the answer concise.";

/// Tuning knobs for [`rag_graph`].
#[derive(Debug, Clone, Copy)]
pub struct RagOptions {
    /// Documents fetched per retrieval round.
    pub top_k: usize,
    /// Query rewrites allowed before generation is forced.
    pub max_query_rewrites: u64,
}

impl Default for RagOptions {
    fn default() -> Self {
        Self {
            top_k: 4,
            max_query_rewrites: 2,
        }
    }
}

/// Build the corrective RAG workflow.
pub fn rag_graph(
    model: Arc<dyn ChatModel>,
    retriever: Arc<dyn Retriever>,
    options: RagOptions,
) -> Result<CompiledGraph> {
    let mut graph = StateGraph::new();
    graph
        .add_channel("question", MergePolicy::Replace)
        .add_channel("documents", MergePolicy::Replace)
        .add_channel("generation", MergePolicy::Replace)
        .add_channel("retry_count", MergePolicy::Replace);

    let retrieve_retriever = Arc::clone(&retriever);
    let top_k = options.top_k;
    graph.add_node("retrieve", move |state: Value| {
        let retriever = Arc::clone(&retrieve_retriever);
        async move {
            let question = state["question"].as_str().unwrap_or_default().to_string();
            tracing::debug!(%question, "retrieving documents");
            let hits = retriever.search(&question, top_k).await?;
            let documents: Vec<String> = hits.iter().map(|hit| hit.as_context_line()).collect();
            Ok(json!({"documents": documents}))
        }
    });

    let grade_model = Arc::clone(&model);
    graph.add_node("grade", move |state: Value| {
        let model = Arc::clone(&grade_model);
        async move {
            let question = state["question"].as_str().unwrap_or_default().to_string();
            let documents: Vec<String> = state["documents"]
                .as_array()
                .map(|docs| {
                    docs.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();

            let mut kept = Vec::with_capacity(documents.len());
            for document in documents {
                let request = GenerateRequest::new(format!(
                    "Document:\n{document}\n\nQuestion: {question}"
                ))
                .with_system_prompt(GRADER_SYSTEM)
                .with_temperature(0.0);

                match model.generate(request).await {
                    Ok(response) => {
                        if response.content.to_lowercase().contains("yes") {
                            kept.push(document);
                        } else {
                            tracing::debug!("document filtered as irrelevant");
                        }
                    }
                    Err(err) => {
                        // Grading is advisory: keep the document rather
                        // than fail the whole run.
                        tracing::warn!(error = %err, "grading call failed, keeping document");
                        kept.push(document);
                    }
                }
            }

            Ok(json!({"documents": kept}))
        }
    });

    let rewrite_model = Arc::clone(&model);
    graph.add_node("transform_query", move |state: Value| {
        let model = Arc::clone(&rewrite_model);
        async move {
            let question = state["question"].as_str().unwrap_or_default().to_string();
            let retries = state["retry_count"].as_u64().unwrap_or(0);
            let response = model
                .generate(
                    GenerateRequest::new(format!("Initial question:\n{question}"))
                        .with_system_prompt(REWRITE_SYSTEM)
                        .with_temperature(0.0),
                )
                .await?;
            Ok(json!({
                "question": response.content,
                "retry_count": retries + 1,
            }))
        }
    });

    let generate_model = Arc::clone(&model);
    graph.add_node("generate", move |state: Value| {
        let model = Arc::clone(&generate_model);
        async move {
            let question = state["question"].as_str().unwrap_or_default().to_string();
            let context = state["documents"]
                .as_array()
                .map(|docs| {
                    docs.iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join("\n\n")
                })
                .filter(|context| !context.is_empty())
                .unwrap_or_else(|| "(no relevant context found)".to_string());

            let response = model
                .generate(
                    GenerateRequest::new(format!("Question: {question}\nContext: {context}"))
                        .with_system_prompt(GENERATE_SYSTEM),
                )
                .await?;
            Ok(json!({"generation": response.content}))
        }
    });

    let max_rewrites = options.max_query_rewrites;
    graph
        .set_entry_point("retrieve")
        .add_edge("retrieve", "grade")
        .add_conditional_edges(
            "grade",
            move |state: &Value| {
                let no_docs = state["documents"]
                    .as_array()
                    .map_or(true, |docs| docs.is_empty());
                let retries = state["retry_count"].as_u64().unwrap_or(0);
                if no_docs && retries < max_rewrites {
                    "transform_query".to_string()
                } else {
                    // Either something relevant survived, or the rewrite
                    // budget is spent: answer with what we have.
                    "generate".to_string()
                }
            },
            [("transform_query", "transform_query"), ("generate", "generate")],
        )
        .add_edge("transform_query", "retrieve")
        .add_edge("generate", END);

    Ok(graph.compile()?)
}
