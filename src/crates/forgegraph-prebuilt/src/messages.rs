//! Chat message model shared by the prebuilt workflows.
//!
//! Every workflow keeps its conversation on an append-only `messages`
//! channel; these helpers convert between the channel's JSON form and
//! typed messages, and render transcripts for prompt building.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    Human,
    Assistant,
    Tool,
}

/// One entry in a workflow's message history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
        }
    }

    /// JSON form for the `messages` channel.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("chat messages always serialize")
    }
}

/// Deserialize the `messages` channel; entries that are plain strings are
/// treated as human messages, malformed entries are skipped.
pub fn messages_from_state(state: &Value) -> Vec<ChatMessage> {
    state["messages"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    if let Some(text) = item.as_str() {
                        return Some(ChatMessage::human(text));
                    }
                    serde_json::from_value(item.clone()).ok()
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Last message on the channel, if any.
pub fn last_message(state: &Value) -> Option<ChatMessage> {
    messages_from_state(state).into_iter().last()
}

/// Render a history as `role: content` lines for a prompt.
pub fn transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|message| {
            let role = match message.role {
                MessageRole::System => "system",
                MessageRole::Human => "human",
                MessageRole::Assistant => "assistant",
                MessageRole::Tool => "tool",
            };
            format!("{role}: {}", message.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
