//! TODO solver: pick the top open task from a TODO file and propose a fix.
//!
//! ```text
//! parse ──(no open tasks)──▶ END
//!   │
//!   ▼
//! gather ──(READ: …)──▶ tools ──▶ gather   (loop)
//!   │
//!   ▼ (READY)
//! propose ──▶ END
//! ```
//!
//! The parser reads the TODO file through the sandboxed [`FileTools`] and
//! extracts unchecked `- [ ]` items; if there is nothing to do the run
//! terminates immediately. Otherwise the gather node lets the model request
//! source files with `READ: <path>` lines, the tools node serves them, and
//! the loop continues until the model answers `READY`, at which point the
//! propose node drafts the fix. The loop is bounded by the model ceasing to
//! request files, backstopped by the engine's recursion limit.

use crate::error::Result;
use crate::messages::{last_message, messages_from_state, transcript, ChatMessage, MessageRole};
use crate::tools::FileTools;
use forgegraph_core::{ChatModel, CompiledGraph, GenerateRequest, MergePolicy, StateGraph, END};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};

const GATHER_SYSTEM: &str = "You are a Senior Engineer triaging a task. Request the source files \
    you need, one per line, as 'READ: <path>'. When you have enough context, reply 'READY' \
    followed by your assessment.";

const PROPOSE_SYSTEM: &str = "You are a Senior Engineer. Based on the gathered context, propose a \
    concrete code change that resolves the task. Include the files to edit and the new code.";

fn open_tasks(content: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^\s*[-*] \[ \]\s*(.+)$").expect("static pattern"));
    re.captures_iter(content)
        .filter_map(|captures| captures.get(1))
        .map(|task| task.as_str().trim().to_string())
        .collect()
}

fn read_directives(text: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?m)^READ:\s*(.+)$").expect("static pattern"));
    re.captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|path| path.as_str().trim().to_string())
        .collect()
}

/// Build the TODO solver workflow over the given sandbox.
pub fn todo_graph(model: Arc<dyn ChatModel>, files: FileTools) -> Result<CompiledGraph> {
    let files = Arc::new(files);
    let mut graph = StateGraph::new();
    graph
        .add_channel("target_file", MergePolicy::Replace)
        .add_channel("tasks", MergePolicy::Replace)
        .add_channel("selected_task", MergePolicy::Replace)
        .add_channel("messages", MergePolicy::Append)
        .add_channel("code_proposal", MergePolicy::Replace);

    let parse_files = Arc::clone(&files);
    graph.add_node("parse", move |state: Value| {
        let files = Arc::clone(&parse_files);
        async move {
            let target = state["target_file"].as_str().unwrap_or("TODO.md").to_string();
            let content = files.read_file(&target);
            let tasks = open_tasks(&content);
            tracing::debug!(target, open = tasks.len(), "parsed todo file");

            let selected = tasks.first().cloned().map(Value::String).unwrap_or(Value::Null);
            let note = format!("Found {} open task(s) in {target}.", tasks.len());
            Ok(json!({
                "tasks": tasks,
                "selected_task": selected,
                "messages": [ChatMessage::tool(note).to_value()],
            }))
        }
    });

    let gather_model = Arc::clone(&model);
    graph.add_node("gather", move |state: Value| {
        let model = Arc::clone(&gather_model);
        async move {
            let task = state["selected_task"].as_str().unwrap_or_default().to_string();
            let history = messages_from_state(&state);
            let prompt = format!("Task: {task}\n\n{}", transcript(&history));
            let response = model
                .generate(
                    GenerateRequest::new(prompt)
                        .with_system_prompt(GATHER_SYSTEM)
                        .with_temperature(0.0),
                )
                .await?;
            Ok(json!({"messages": [ChatMessage::assistant(response.content).to_value()]}))
        }
    });

    let tools_files = Arc::clone(&files);
    graph.add_node("tools", move |state: Value| {
        let files = Arc::clone(&tools_files);
        async move {
            let paths = last_message(&state)
                .map(|message| read_directives(&message.content))
                .unwrap_or_default();

            let mut sections = Vec::with_capacity(paths.len());
            for path in paths {
                sections.push(format!("--- {path} ---\n{}", files.read_file(&path)));
            }
            Ok(json!({
                "messages": [ChatMessage::tool(sections.join("\n\n")).to_value()]
            }))
        }
    });

    let propose_model = Arc::clone(&model);
    graph.add_node("propose", move |state: Value| {
        let model = Arc::clone(&propose_model);
        async move {
            let task = state["selected_task"].as_str().unwrap_or_default().to_string();
            let history = messages_from_state(&state);
            let prompt = format!("Task: {task}\n\n{}", transcript(&history));
            let response = model
                .generate(GenerateRequest::new(prompt).with_system_prompt(PROPOSE_SYSTEM))
                .await?;
            Ok(json!({
                "code_proposal": response.content.clone(),
                "messages": [ChatMessage::assistant(response.content).to_value()],
            }))
        }
    });

    graph
        .set_entry_point("parse")
        .add_conditional_edges(
            "parse",
            |state: &Value| {
                let has_work = state["tasks"].as_array().is_some_and(|tasks| !tasks.is_empty());
                if has_work { "gather".to_string() } else { "done".to_string() }
            },
            [("gather", "gather"), ("done", END)],
        )
        .add_conditional_edges(
            "gather",
            |state: &Value| {
                let wants_files = last_message(state).is_some_and(|message| {
                    message.role == MessageRole::Assistant
                        && !read_directives(&message.content).is_empty()
                });
                if wants_files { "tools".to_string() } else { "propose".to_string() }
            },
            [("tools", "tools"), ("propose", "propose")],
        )
        .add_edge("tools", "gather")
        .add_edge("propose", END);

    Ok(graph.compile()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SequenceModel;
    use std::fs;

    #[tokio::test]
    async fn no_open_tasks_terminates_without_model_calls() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("TODO.md"), "- [x] already done\n").unwrap();

        let model = Arc::new(SequenceModel::of_texts(Vec::<String>::new()));
        let graph = todo_graph(model.clone(), FileTools::new(dir.path())).unwrap();

        let result = graph.invoke(json!({"target_file": "TODO.md"})).await.unwrap();
        assert_eq!(result["tasks"], json!([]));
        assert_eq!(result["selected_task"], Value::Null);
        assert!(result.get("code_proposal").is_none());
        assert!(model.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gathers_context_then_proposes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("TODO.md"),
            "- [x] ship v1\n- [ ] fix the parser\n- [ ] update docs\n",
        )
        .unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/parser.rs"), "fn parse() { /* broken */ }\n").unwrap();

        let model = Arc::new(SequenceModel::of_texts([
            "READ: src/parser.rs",
            "READY: the parse function ignores its input.",
            "Proposal: rewrite parse() to return a Result.",
        ]));
        let graph = todo_graph(model.clone(), FileTools::new(dir.path())).unwrap();

        let result = graph.invoke(json!({})).await.unwrap();

        assert_eq!(result["selected_task"], "fix the parser");
        assert_eq!(result["tasks"], json!(["fix the parser", "update docs"]));
        assert_eq!(
            result["code_proposal"],
            "Proposal: rewrite parse() to return a Result."
        );

        // The served file content reached the conversation.
        let history = messages_from_state(&result);
        assert!(history
            .iter()
            .any(|m| m.role == MessageRole::Tool && m.content.contains("/* broken */")));
        assert_eq!(model.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn missing_todo_file_counts_as_no_work() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(SequenceModel::of_texts(Vec::<String>::new()));
        let graph = todo_graph(model, FileTools::new(dir.path())).unwrap();

        let result = graph.invoke(json!({})).await.unwrap();
        assert_eq!(result["tasks"], json!([]));
    }

    #[test]
    fn task_extraction() {
        let tasks = open_tasks("- [x] done\n- [ ] first\n  * [ ] nested second\nplain line\n");
        assert_eq!(tasks, vec!["first", "nested second"]);
    }

    #[test]
    fn directive_extraction() {
        let paths = read_directives("READ: src/a.rs\nsome text\nREAD: src/b.rs\n");
        assert_eq!(paths, vec!["src/a.rs", "src/b.rs"]);
    }
}
