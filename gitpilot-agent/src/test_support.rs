//! In-memory provider that replays a fixed script of responses.

use std::collections::VecDeque;
use std::sync::Mutex;

use gitpilot_core::{CompletionRequest, CompletionResponse, LlmProvider, ProviderError};

/// Pops one scripted outcome per `complete` call and records every request.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text reply
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.respond(CompletionResponse::text(content))
    }

    pub fn respond(self, response: CompletionResponse) -> Self {
        self.push(Ok(response))
    }

    pub fn fail(self, error: ProviderError) -> Self {
        self.push(Err(error))
    }

    fn push(self, outcome: Result<CompletionResponse, ProviderError>) -> Self {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(outcome);
        self
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script lock poisoned").len()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .push(request);
        self.script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Other("script exhausted".into())))
    }
}
