//! Prompt assembly
//!
//! Builds the single request payload sent to a provider: an optional inline
//! binary part followed by exactly one text part holding persona, history,
//! extracted document text, and the user's message, in that order.

use crate::ingest::ExtractionResult;
use crate::models::{ConversationTurn, Role};
use crate::prompts;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    Binary { media_type: String, bytes: Vec<u8> },
}

/// Ordered content parts. At most one binary part, always before the single
/// trailing text part; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPayload {
    parts: Vec<PromptPart>,
}

impl PromptPayload {
    pub fn text_only(text: String) -> Self {
        Self {
            parts: vec![PromptPart::Text(text)],
        }
    }

    pub fn with_binary(media_type: String, bytes: Vec<u8>, text: String) -> Self {
        Self {
            parts: vec![
                PromptPart::Binary { media_type, bytes },
                PromptPart::Text(text),
            ],
        }
    }

    pub fn parts(&self) -> &[PromptPart] {
        &self.parts
    }

    /// The trailing text part.
    pub fn text(&self) -> &str {
        match self.parts.last() {
            Some(PromptPart::Text(text)) => text,
            _ => "",
        }
    }

    pub fn binary(&self) -> Option<(&str, &[u8])> {
        self.parts.iter().find_map(|part| match part {
            PromptPart::Binary { media_type, bytes } => Some((media_type.as_str(), bytes.as_slice())),
            PromptPart::Text(_) => None,
        })
    }
}

/// Persona text followed by the optional user-name line.
pub fn persona_block(persona: &str, user_name: Option<&str>) -> String {
    let persona = persona.trim();
    match user_name {
        Some(name) => format!(
            "{}\n{}",
            persona,
            prompts::render(prompts::USER_NAME_LINE, &[("name", name)])
        ),
        None => persona.to_string(),
    }
}

/// Render history as `Role: text` lines in chronological order.
pub fn render_history(history: &[ConversationTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn assemble(
    persona: &str,
    history: &[ConversationTurn],
    extraction: ExtractionResult,
    user_message: &str,
) -> PromptPayload {
    let mut segments = vec![persona.trim().to_string()];

    if !history.is_empty() {
        segments.push(render_history(history));
    }

    let mut binary = None;
    match extraction {
        ExtractionResult::Text { label, content } => segments.push(prompts::render(
            prompts::FILE_SECTION,
            &[("label", label), ("content", &content)],
        )),
        ExtractionResult::Failed { reason } => segments.push(prompts::render(
            prompts::FILE_FAILED_NOTE,
            &[("reason", &reason)],
        )),
        ExtractionResult::Binary { media_type, bytes } => binary = Some((media_type, bytes)),
        ExtractionResult::Empty => {}
    }

    let message = if user_message.trim().is_empty() {
        prompts::EMPTY_MESSAGE_PLACEHOLDER
    } else {
        user_message
    };
    segments.push(format!("{}: {}", Role::User.label(), message));

    let text = segments.join("\n\n");
    match binary {
        Some((media_type, bytes)) => PromptPayload::with_binary(media_type, bytes, text),
        None => PromptPayload::text_only(text),
    }
}
