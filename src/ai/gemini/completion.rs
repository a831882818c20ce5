use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, InlineData, Part};
use crate::ai::{CompletionProvider, ProviderError};
use crate::assembler::{PromptPart, PromptPayload};
use crate::models::Credential;
use async_trait::async_trait;
use base64::Engine as _;
use std::time::Duration;

/// [`CompletionProvider`] backed by the Gemini REST API.
pub struct GeminiCompletionProvider {
    http: GeminiHttpClient,
}

impl GeminiCompletionProvider {
    pub fn new() -> Self {
        Self::new_with_client(reqwest::Client::new())
    }

    pub fn new_with_client(client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(client),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn build_request(payload: &PromptPayload) -> GenerateContentRequest {
        let parts = payload
            .parts()
            .iter()
            .map(|part| match part {
                PromptPart::Text(text) => Part::Text { text: text.clone() },
                PromptPart::Binary { media_type, bytes } => Part::InlineData {
                    inline_data: InlineData {
                        mime_type: media_type.clone(),
                        data: base64::engine::general_purpose::STANDARD.encode(bytes),
                    },
                },
            })
            .collect();

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        }
    }

    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let content = response.candidates.first()?.content.as_ref()?;
        let text = content
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl Default for GeminiCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for GeminiCompletionProvider {
    async fn complete(
        &self,
        model: &str,
        credential: &Credential,
        payload: &PromptPayload,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        tracing::debug!(
            "Sending generateContent to Gemini model {} ({} parts)",
            model,
            payload.parts().len()
        );

        let request = Self::build_request(payload);
        let response: GenerateContentResponse = self
            .http
            .generate_content(model, credential.expose(), &request, timeout)
            .await?;

        Self::extract_text(&response).ok_or(ProviderError::EmptyReply)
    }
}
