use super::{CompletionProvider, ProviderError};
use crate::assembler::PromptPayload;
use crate::models::Credential;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One call observed by [`MockCompletionProvider`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub credential: Credential,
    pub prompt_text: String,
    pub has_binary: bool,
}

/// Scripted provider: outcomes are returned in the order they were queued,
/// then every further call gets the default reply.
#[derive(Clone)]
pub struct MockCompletionProvider {
    outcomes: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    default_reply: String,
    delay: Option<Duration>,
}

impl MockCompletionProvider {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            default_reply: "Mock reply".to_string(),
            delay: None,
        }
    }

    pub fn with_reply(self, reply: &str) -> Self {
        self.outcomes.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn with_error(self, error: ProviderError) -> Self {
        self.outcomes.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_quota_exhausted(self) -> Self {
        self.with_error(ProviderError::QuotaExhausted {
            status: 429,
            message: "Resource has been exhausted".to_string(),
        })
    }

    pub fn with_default_reply(mut self, reply: &str) -> Self {
        self.default_reply = reply.to_string();
        self
    }

    /// Sleep before answering each call, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(
        &self,
        model: &str,
        credential: &Credential,
        payload: &PromptPayload,
        _timeout: Duration,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            credential: credential.clone(),
            prompt_text: payload.text().to_string(),
            has_binary: payload.binary().is_some(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.default_reply.clone()))
    }
}
