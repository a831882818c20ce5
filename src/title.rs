//! Conversation title generation
//!
//! A short label for the conversation list, produced by one extra provider
//! call on the first turn only. Failures never affect the reply.

use crate::ai::CompletionProvider;
use crate::assembler::PromptPayload;
use crate::gateway::ProviderCandidate;
use crate::prompts;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_TITLE_WORDS: usize = 4;

pub struct TitleGenerator {
    provider: Arc<dyn CompletionProvider>,
    call_timeout: Duration,
    model_override: Option<String>,
}

impl TitleGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, call_timeout: Duration) -> Self {
        Self {
            provider,
            call_timeout,
            model_override: None,
        }
    }

    /// Use a fixed model for titles instead of the one that answered the chat.
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model_override = model;
        self
    }

    /// Returns `None` when the conversation already has more than one prior
    /// turn, or when the title call fails or produces nothing usable.
    pub async fn maybe_generate_title(
        &self,
        conversation_length: usize,
        seed_message: &str,
        candidate: &ProviderCandidate,
    ) -> Option<String> {
        if conversation_length > 1 {
            debug!(
                "Skipping title generation for conversation with {} prior turns",
                conversation_length
            );
            return None;
        }

        let seed = if seed_message.trim().is_empty() {
            prompts::EMPTY_MESSAGE_PLACEHOLDER
        } else {
            seed_message.trim()
        };
        let prompt = format!(
            "{}\n\n{}",
            prompts::TITLE_SYSTEM.trim(),
            prompts::render(prompts::TITLE_USER.trim(), &[("message", seed)])
        );
        let model = self.model_override.as_deref().unwrap_or(&candidate.model);
        let payload = PromptPayload::text_only(prompt);

        let call = self.provider.complete(
            model,
            &candidate.credential,
            &payload,
            self.call_timeout,
        );
        let raw = match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!("Title generation with {} failed: {}", model, e);
                return None;
            }
            Err(_) => {
                warn!(
                    "Title generation with {} timed out after {:?}",
                    model, self.call_timeout
                );
                return None;
            }
        };

        let title = sanitize_title(&raw);
        match &title {
            Some(title) => debug!("Generated title: {}", title),
            None => warn!("Title generation with {} returned nothing usable", model),
        }
        title
    }
}

/// Strip punctuation and quotes, collapse whitespace, keep the first few words.
pub fn sanitize_title(raw: &str) -> Option<String> {
    let first_line = raw.lines().find(|line| !line.trim().is_empty())?;
    let cleaned: String = first_line
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();

    let words: Vec<&str> = cleaned
        .split_whitespace()
        .map(|word| word.trim_matches('-'))
        .filter(|word| !word.is_empty())
        .take(MAX_TITLE_WORDS)
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}
