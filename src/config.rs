//! Gateway configuration loaded from the environment.

use crate::gateway::{resolve_candidates, CandidateOrder, FallbackPolicy, ProviderCandidate};
use crate::models::Credential;
use crate::prompts;
use crate::quick_reply::QuickReplyTable;
use crate::{Error, Result};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Immutable settings shared by every request.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub persona: String,
    pub models: Vec<String>,
    pub credentials: Vec<Credential>,
    pub candidate_order: CandidateOrder,
    pub fallback_policy: FallbackPolicy,
    pub call_timeout: Duration,
    pub title_generation: bool,
    pub title_model: Option<String>,
    pub expose_error_detail: bool,
    pub quick_replies: QuickReplyTable,
    pub gemini_base_url: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            persona: prompts::PERSONA.to_string(),
            models: vec![DEFAULT_MODEL.to_string()],
            credentials: Vec::new(),
            candidate_order: CandidateOrder::default(),
            fallback_policy: FallbackPolicy::default(),
            call_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            title_generation: true,
            title_model: None,
            expose_error_detail: false,
            quick_replies: QuickReplyTable::default(),
            gemini_base_url: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Missing credentials are allowed here and
    /// surface as [`Error::NoProvidersConfigured`] when a request is sent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let credentials: Vec<Credential> = get("GEMINI_API_KEYS")
            .or_else(|| get("GOOGLE_API_KEY"))
            .map(|keys| split_list(&keys).into_iter().map(Credential::new).collect())
            .unwrap_or_default();

        let models = match get("GEMINI_MODELS") {
            Some(models) => split_list(&models),
            None => vec![DEFAULT_MODEL.to_string()],
        };

        let candidate_order = get("CANDIDATE_ORDER")
            .map(|value| value.parse::<CandidateOrder>())
            .transpose()?
            .unwrap_or_default();
        let fallback_policy = get("FALLBACK_POLICY")
            .map(|value| value.parse::<FallbackPolicy>())
            .transpose()?
            .unwrap_or_default();

        let call_timeout = match get("PROVIDER_TIMEOUT_SECS") {
            Some(value) => parse_timeout(&value)?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let persona = match get("PERSONA_FILE") {
            Some(path) => std::fs::read_to_string(&path).map_err(|e| {
                Error::Configuration(format!("Cannot read PERSONA_FILE {}: {}", path, e))
            })?,
            None => prompts::PERSONA.to_string(),
        };

        Ok(Self {
            persona,
            models,
            credentials,
            candidate_order,
            fallback_policy,
            call_timeout,
            title_generation: parse_flag("TITLE_GENERATION", get("TITLE_GENERATION"), true)?,
            title_model: get("TITLE_MODEL"),
            expose_error_detail: parse_flag(
                "EXPOSE_ERROR_DETAIL",
                get("EXPOSE_ERROR_DETAIL"),
                false,
            )?,
            quick_replies: QuickReplyTable::builtin()?,
            gemini_base_url: get("GEMINI_BASE_URL"),
        })
    }

    /// The flattened attempt order for every request.
    pub fn candidates(&self) -> Vec<ProviderCandidate> {
        resolve_candidates(&self.models, &self.credentials, self.candidate_order)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_timeout(value: &str) -> Result<Duration> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(Error::Configuration(format!(
            "PROVIDER_TIMEOUT_SECS must be a positive number of seconds, got '{}'",
            value
        ))),
    }
}

fn parse_flag(key: &str, value: Option<String>, default: bool) -> Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Configuration(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}
