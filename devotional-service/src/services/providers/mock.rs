//! Mock provider implementation for testing.
//!
//! Replies come from, in order: the scripted queue, the first matching
//! prompt rule, then the fallback.

use super::{GenerationParams, ProviderError, TextProvider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

/// One canned provider outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Status(u16, String),
    Network(String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn overloaded() -> Self {
        MockReply::Status(503, "The model is overloaded. Please try again later.".to_string())
    }

    fn into_result(self) -> Result<String, ProviderError> {
        match self {
            MockReply::Text(text) => Ok(text),
            MockReply::Status(status, body) => Err(ProviderError::Status { status, body }),
            MockReply::Network(message) => Err(ProviderError::Network(message)),
        }
    }
}

/// A call observed by the mock.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub params: GenerationParams,
    pub at: Instant,
}

/// Mock text provider for testing.
pub struct MockTextProvider {
    script: Mutex<VecDeque<MockReply>>,
    rules: Vec<(String, MockReply)>,
    fallback: MockReply,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTextProvider {
    /// A provider answering every call with `fallback`.
    pub fn new(fallback: MockReply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            rules: Vec::new(),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A provider that plays `replies` in order, then a 500.
    pub fn scripted(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let provider = Self::new(MockReply::Status(500, "script exhausted".to_string()));
        provider.push_all(replies);
        provider
    }

    /// Answer prompts containing `needle` with `reply` once the script is empty.
    pub fn when_prompt_contains(mut self, needle: impl Into<String>, reply: MockReply) -> Self {
        self.rules.push((needle.into(), reply));
        self
    }

    pub fn push_all(&self, replies: impl IntoIterator<Item = MockReply>) {
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .extend(replies);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock calls lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock calls lock poisoned").len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.prompt).collect()
    }

    fn next_reply(&self, prompt: &str) -> MockReply {
        if let Some(reply) = self
            .script
            .lock()
            .expect("mock script lock poisoned")
            .pop_front()
        {
            return reply;
        }

        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .expect("mock calls lock poisoned")
            .push(RecordedCall {
                prompt: prompt.to_string(),
                params: *params,
                at: Instant::now(),
            });

        self.next_reply(prompt).into_result()
    }
}
