//! Application orchestration for one chat turn.
//!
//! `request → quick reply? → ingest → assemble → gateway → title? → response`

use crate::ai::{CompletionProvider, GeminiCompletionProvider};
use crate::assembler::{assemble, persona_block};
use crate::config::GatewayConfig;
use crate::gateway::{ProviderCandidate, ProviderGateway};
use crate::ingest::Ingestor;
use crate::models::{ChatRequest, ChatResponse};
use crate::prompts;
use crate::title::TitleGenerator;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

/// Handles chat turns against a fixed configuration and provider.
pub struct App {
    config: GatewayConfig,
    candidates: Vec<ProviderCandidate>,
    ingestor: Ingestor,
    gateway: ProviderGateway,
    titles: TitleGenerator,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub provider: Arc<dyn CompletionProvider>,
    pub ingestor: Ingestor,
}

impl AppServices {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            ingestor: Ingestor::default(),
        }
    }
}

impl App {
    /// Build an app from concrete service dependencies.
    ///
    /// This is primarily useful for integration tests and local harnesses that
    /// need to inject mocks.
    pub fn with_services(config: GatewayConfig, services: AppServices) -> Self {
        let candidates = config.candidates();
        let gateway = ProviderGateway::new(
            Arc::clone(&services.provider),
            config.fallback_policy,
            config.call_timeout,
        );
        let titles = TitleGenerator::new(services.provider, config.call_timeout)
            .with_model(config.title_model.clone());

        Self {
            config,
            candidates,
            ingestor: services.ingestor,
            gateway,
            titles,
        }
    }

    /// Construct an app from environment configuration (`GatewayConfig::from_env`).
    pub fn new() -> Result<Self> {
        let config = GatewayConfig::from_env()?;

        let mut provider = GeminiCompletionProvider::new();
        if let Some(base_url) = &config.gemini_base_url {
            info!("Using Gemini base URL {}", base_url);
            provider = provider.with_base_url(base_url.clone());
        }

        let app = Self::with_services(config, AppServices::new(Arc::new(provider)));
        if app.candidates.is_empty() {
            warn!("No Gemini API keys configured; every chat request will fail");
        } else {
            info!(
                "Configured {} provider candidate(s) over {} model(s)",
                app.candidates.len(),
                app.config.models.len()
            );
        }
        Ok(app)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The resolved attempt order.
    pub fn candidates(&self) -> &[ProviderCandidate] {
        &self.candidates
    }

    /// Parse and handle a raw JSON request body.
    pub async fn handle_json(&self, body: &str) -> ChatResponse {
        match ChatRequest::from_json(body) {
            Ok(request) => self.handle(request).await,
            Err(e) => self.failure_response(e),
        }
    }

    pub async fn handle(&self, request: ChatRequest) -> ChatResponse {
        let span = tracing::info_span!("chat", request_id = %Uuid::new_v4());
        async {
            let response = match self.process(&request).await {
                Ok(response) => response,
                Err(e) => self.failure_response(e),
            };
            info!("Responding with status {}", response.status);
            response
        }
        .instrument(span)
        .await
    }

    async fn process(&self, request: &ChatRequest) -> Result<ChatResponse> {
        info!(
            "Chat turn: {} prior turn(s), attachment: {}",
            request.history.len(),
            request
                .attachment
                .as_ref()
                .map_or("none", |a| a.media_type.as_str())
        );

        if request.attachment.is_none() && request.history.is_empty() {
            if let Some(canned) = self.config.quick_replies.lookup(&request.message) {
                debug!("Answered from quick-reply table");
                return Ok(ChatResponse::reply(canned, None));
            }
        }

        let extraction = self.ingestor.ingest(request.attachment.as_ref());
        let persona = persona_block(&self.config.persona, request.user_name.as_deref());
        let payload = assemble(&persona, &request.history, extraction, &request.message);

        let sent = self.gateway.send(&payload, &self.candidates).await?;
        debug!(
            "Reply from {} after {} attempt(s)",
            sent.candidate.model, sent.attempts
        );

        let title = if self.config.title_generation {
            self.titles
                .maybe_generate_title(request.history.len(), &request.message, &sent.candidate)
                .await
        } else {
            None
        };

        Ok(ChatResponse::reply(sent.reply, title))
    }

    fn failure_response(&self, err: Error) -> ChatResponse {
        match &err {
            Error::InvalidRequest(detail) => {
                warn!("Rejected request: {}", detail);
                ChatResponse::error(400, prompts::INVALID_REQUEST, Some(detail.clone()))
            }
            Error::ProviderFatal { .. } if err.is_soft() => {
                warn!("{}", err);
                ChatResponse::reply(prompts::EMPTY_REPLY, None)
            }
            _ if err.is_soft() => {
                warn!("{}", err);
                ChatResponse::reply(prompts::BUSY_REPLY, None)
            }
            _ => {
                error!("Chat turn failed: {}", err);
                let detail = self.config.expose_error_detail.then(|| err.to_string());
                ChatResponse::error(500, prompts::GENERIC_FAILURE, detail)
            }
        }
    }
}
