//! Research workflow with a human approval gate.
//!
//! ```text
//! researcher ──(SEARCH: …)──▶ tools ──▶ researcher   (loop)
//!     │
//!     ▼ (no tool request)
//! manager  ◀── interrupt: run pauses here
//!     │ feedback == APPROVE  ──▶ writer ──▶ END
//!     │ feedback == anything ──▶ researcher
//!     └ no feedback          ──▶ manager   (stays paused)
//! ```
//!
//! The researcher asks for lookups by emitting `SEARCH: <query>` lines; the
//! tools node runs them against the injected [`Retriever`] and feeds the
//! hits back as a tool message. The manager node is pure pause point: the
//! run halts before it, an external reviewer injects a `feedback` value via
//! `update_state(..., as_node = "manager")`, and resumption routes on that
//! value. Without feedback the router deliberately re-enters the gate:
//! approval must be explicit, absence of a signal is not consent.

use crate::error::Result;
use crate::messages::{last_message, messages_from_state, transcript, ChatMessage, MessageRole};
use forgegraph_core::{
    ChatModel, CompiledGraph, GenerateRequest, MergePolicy, Retriever, StateGraph, END,
};
use forgegraph_checkpoint::Checkpointer;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};

const RESEARCHER_SYSTEM: &str = "You are a Lead Researcher. Investigate the user's topic in depth. \
    To look something up, reply with a single line 'SEARCH: <query>'. \
    Once your findings are complete, summarize them with no SEARCH line.";

const WRITER_SYSTEM: &str = "You are a Professional Tech Writer. Using the research context above, \
    write a comprehensive, engaging blog post. Use Markdown formatting.";

fn search_directive(text: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^SEARCH:\s*(.+)$").expect("static pattern"));
    re.captures(text)
        .and_then(|captures| captures.get(1))
        .map(|query| query.as_str().trim().to_string())
}

/// Build the research workflow. The returned graph pauses before `manager`
/// and therefore requires the given checkpoint store.
pub fn research_graph(
    model: Arc<dyn ChatModel>,
    retriever: Arc<dyn Retriever>,
    checkpointer: Arc<dyn Checkpointer>,
) -> Result<CompiledGraph> {
    let mut graph = StateGraph::new();
    graph
        .add_channel("messages", MergePolicy::Append)
        .add_channel("research_data", MergePolicy::Replace)
        .add_channel("feedback", MergePolicy::Replace)
        .add_channel("report", MergePolicy::Replace);

    let researcher_model = Arc::clone(&model);
    graph.add_node("researcher", move |state: Value| {
        let model = Arc::clone(&researcher_model);
        async move {
            let history = messages_from_state(&state);
            let response = model
                .generate(
                    GenerateRequest::new(transcript(&history))
                        .with_system_prompt(RESEARCHER_SYSTEM)
                        .with_temperature(0.0),
                )
                .await?;

            let mut update = json!({
                "messages": [ChatMessage::assistant(&response.content).to_value()]
            });
            if search_directive(&response.content).is_none() {
                update["research_data"] = Value::String(response.content);
            }
            Ok(update)
        }
    });

    graph.add_node("manager", |_state: Value| async move {
        // Pure pause point; the router below reads externally injected
        // feedback after resumption.
        Ok(json!({}))
    });

    let tools_retriever = Arc::clone(&retriever);
    graph.add_node("tools", move |state: Value| {
        let retriever = Arc::clone(&tools_retriever);
        async move {
            let query = last_message(&state)
                .and_then(|message| search_directive(&message.content))
                .unwrap_or_default();

            let content = match retriever.search(&query, 5).await {
                Ok(hits) if hits.is_empty() => format!("No results for '{query}'."),
                Ok(hits) => hits
                    .iter()
                    .map(|hit| hit.as_context_line())
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(err) => {
                    // Degrade rather than abort: the researcher sees the
                    // failure and can rephrase or conclude without it.
                    tracing::warn!(error = %err, query, "search failed");
                    format!("Search failed: {err}")
                }
            };

            Ok(json!({"messages": [ChatMessage::tool(content).to_value()]}))
        }
    });

    let writer_model = Arc::clone(&model);
    graph.add_node("writer", move |state: Value| {
        let model = Arc::clone(&writer_model);
        async move {
            let history = messages_from_state(&state);
            let response = model
                .generate(
                    GenerateRequest::new(transcript(&history)).with_system_prompt(WRITER_SYSTEM),
                )
                .await?;

            Ok(json!({
                "report": response.content,
                "messages": [ChatMessage::assistant(response.content.clone()).to_value()],
            }))
        }
    });

    graph
        .set_entry_point("researcher")
        .add_conditional_edges(
            "researcher",
            |state: &Value| {
                let wants_tool = last_message(state).is_some_and(|message| {
                    message.role == MessageRole::Assistant
                        && search_directive(&message.content).is_some()
                });
                if wants_tool { "tools".to_string() } else { "manager".to_string() }
            },
            [("tools", "tools"), ("manager", "manager")],
        )
        .add_edge("tools", "researcher")
        .add_conditional_edges(
            "manager",
            |state: &Value| match state["feedback"].as_str() {
                Some("APPROVE") => "writer".to_string(),
                Some(_) => "researcher".to_string(),
                // Fail closed: no explicit signal means stay at the gate.
                None => "manager".to_string(),
            },
            [
                ("writer", "writer"),
                ("researcher", "researcher"),
                ("manager", "manager"),
            ],
        )
        .add_edge("writer", END)
        .interrupt_before(["manager"]);

    Ok(graph.compile()?.with_checkpointer(checkpointer))
}
