use super::types::ErrorEnvelope;
use crate::ai::ProviderError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Lightweight Gemini REST client.
///
/// Model and API key are supplied per call so one connection pool can serve
/// every (model, credential) candidate.
pub struct GeminiHttpClient {
    client: Client,
    base_url: String,
}

impl GeminiHttpClient {
    pub fn new() -> Self {
        Self::new_with_client(Client::new())
    }

    pub fn new_with_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Calls Gemini's `generateContent` endpoint.
    ///
    /// `model` may carry a `models/` prefix; it is stripped before building the URL.
    pub async fn generate_content<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        model: &str,
        api_key: &str,
        request: &Req,
        timeout: Duration,
    ) -> Result<Resp, ProviderError> {
        let model = model.strip_prefix("models/").unwrap_or(model);
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Gemini: {}", e);
                transport_error(e, timeout)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        if !status.is_success() {
            tracing::error!("Gemini API error (status {}): {}", status, body);
            return Err(classify_error_response(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}\nBody: {}", e, body);
            ProviderError::InvalidResponse(format!("Failed to parse Gemini response: {}", e))
        })
    }
}

impl Default for GeminiHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Map a non-2xx Gemini response onto the provider error taxonomy.
///
/// Quota exhaustion is signalled either by HTTP 429 or by a
/// `RESOURCE_EXHAUSTED` status in the error envelope.
pub fn classify_error_response(status: u16, body: &str) -> ProviderError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();

    let exhausted = envelope
        .as_ref()
        .and_then(|env| env.error.status.as_deref())
        .is_some_and(|s| s == "RESOURCE_EXHAUSTED");

    let message = envelope
        .map(|env| env.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    if status == 429 || exhausted {
        ProviderError::QuotaExhausted { status, message }
    } else {
        ProviderError::Http { status, message }
    }
}
