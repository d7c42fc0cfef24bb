//! Shared test doubles for workflow tests.

use async_trait::async_trait;
use forgegraph_core::llm::{CollabResult, CollaboratorError};
use forgegraph_core::{ChatModel, GenerateRequest, GenerateResponse};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Model that replays a fixed script of responses in call order. Only for
/// workflows whose supersteps invoke the model one node at a time.
pub struct SequenceModel {
    responses: Mutex<VecDeque<CollabResult<GenerateResponse>>>,
    pub calls: Mutex<Vec<GenerateRequest>>,
}

impl SequenceModel {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = CollabResult<GenerateResponse>>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script of plain successful text responses.
    pub fn of_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            texts
                .into_iter()
                .map(|text| Ok(GenerateResponse::new(text.into()))),
        )
    }
}

#[async_trait]
impl ChatModel for SequenceModel {
    async fn generate(&self, request: GenerateRequest) -> CollabResult<GenerateResponse> {
        self.calls.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CollaboratorError::Provider("script exhausted".into())))
    }
}
