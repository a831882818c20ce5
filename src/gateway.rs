//! Resilient provider gateway
//!
//! Tries an ordered list of (model, credential) candidates one at a time until
//! one returns a reply. Each attempt ends in exactly one [`AttemptOutcome`]:
//!
//! ```text
//! Pending ──► Attempting(candidate) ──Success──────────► Succeeded
//!                 │  ▲
//!                 │  └──RateLimited (next candidate)
//!                 ├──Fatal (abort, unless AnyError) ──► failed
//!                 └──no candidates left ──────────────► Exhausted
//! ```
//!
//! Attempts are strictly sequential: every call spends provider quota, and
//! the order of the list encodes preference. The gateway keeps no state
//! between requests.

use crate::ai::{CompletionProvider, ProviderError};
use crate::assembler::PromptPayload;
use crate::models::Credential;
use crate::{Error, Result};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How models and credentials are interleaved when flattening the candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandidateOrder {
    /// Every credential for the first model, then every credential for the next.
    #[default]
    ModelMajor,
    /// Every model with the first credential, then every model with the next.
    CredentialMajor,
}

impl FromStr for CandidateOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "model-major" | "model_major" => Ok(CandidateOrder::ModelMajor),
            "credential-major" | "credential_major" => Ok(CandidateOrder::CredentialMajor),
            other => Err(Error::Configuration(format!(
                "Unknown candidate order '{}' (expected model-major or credential-major)",
                other
            ))),
        }
    }
}

/// Which failures move the gateway on to the next candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Only quota exhaustion falls through; anything else aborts the loop.
    #[default]
    QuotaOnly,
    /// Quota exhaustion and per-call timeouts fall through.
    QuotaAndTimeouts,
    /// Every failure falls through to the next candidate.
    AnyError,
}

impl FromStr for FallbackPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quota-only" | "quota_only" => Ok(FallbackPolicy::QuotaOnly),
            "quota-and-timeouts" | "quota_and_timeouts" => Ok(FallbackPolicy::QuotaAndTimeouts),
            "any-error" | "any_error" => Ok(FallbackPolicy::AnyError),
            other => Err(Error::Configuration(format!(
                "Unknown fallback policy '{}' (expected quota-only, quota-and-timeouts or any-error)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCandidate {
    pub model: String,
    pub credential: Credential,
}

/// Flatten model order × credential order into one attempt sequence.
pub fn resolve_candidates(
    models: &[String],
    credentials: &[Credential],
    order: CandidateOrder,
) -> Vec<ProviderCandidate> {
    let pair = |model: &String, credential: &Credential| ProviderCandidate {
        model: model.clone(),
        credential: credential.clone(),
    };

    match order {
        CandidateOrder::ModelMajor => models
            .iter()
            .flat_map(|m| credentials.iter().map(move |c| pair(m, c)))
            .collect(),
        CandidateOrder::CredentialMajor => credentials
            .iter()
            .flat_map(|c| models.iter().map(move |m| pair(m, c)))
            .collect(),
    }
}

/// Result of one candidate attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { reply: String },
    RateLimited(ProviderError),
    Fatal(ProviderError),
}

impl AttemptOutcome {
    pub fn classify(
        result: std::result::Result<String, ProviderError>,
        policy: FallbackPolicy,
    ) -> Self {
        match result {
            Ok(reply) if reply.trim().is_empty() => AttemptOutcome::Fatal(ProviderError::EmptyReply),
            Ok(reply) => AttemptOutcome::Success { reply },
            Err(e) if e.is_quota_exhausted() => AttemptOutcome::RateLimited(e),
            Err(e) if e.is_timeout() && policy == FallbackPolicy::QuotaAndTimeouts => {
                AttemptOutcome::RateLimited(e)
            }
            Err(e) => AttemptOutcome::Fatal(e),
        }
    }
}

/// Successful gateway call.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    pub reply: String,
    pub candidate: ProviderCandidate,
    pub attempts: usize,
}

pub struct ProviderGateway {
    provider: Arc<dyn CompletionProvider>,
    policy: FallbackPolicy,
    call_timeout: Duration,
}

impl ProviderGateway {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        policy: FallbackPolicy,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            policy,
            call_timeout,
        }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// One provider call under the per-call time budget.
    pub async fn attempt(
        &self,
        candidate: &ProviderCandidate,
        payload: &PromptPayload,
    ) -> AttemptOutcome {
        let call = self.provider.complete(
            &candidate.model,
            &candidate.credential,
            payload,
            self.call_timeout,
        );
        let result = tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or(Err(ProviderError::Timeout(self.call_timeout)));

        AttemptOutcome::classify(result, self.policy)
    }

    /// Walk `candidates` in order and return the first reply.
    pub async fn send(
        &self,
        payload: &PromptPayload,
        candidates: &[ProviderCandidate],
    ) -> Result<GatewayReply> {
        if candidates.is_empty() {
            error!("No provider candidates configured");
            return Err(Error::NoProvidersConfigured);
        }

        let total = candidates.len();
        let mut last_error = None;

        for (index, candidate) in candidates.iter().enumerate() {
            let attempt = index + 1;
            debug!(
                "Attempt {}/{}: model {} with credential {}",
                attempt,
                total,
                candidate.model,
                candidate.credential.fingerprint()
            );

            match self.attempt(candidate, payload).await {
                AttemptOutcome::Success { reply } => {
                    info!(
                        "Model {} answered on attempt {}/{} ({} chars)",
                        candidate.model,
                        attempt,
                        total,
                        reply.len()
                    );
                    return Ok(GatewayReply {
                        reply,
                        candidate: candidate.clone(),
                        attempts: attempt,
                    });
                }
                AttemptOutcome::RateLimited(e) => {
                    warn!(
                        "Model {} with credential {} is rate limited: {}. Trying next candidate",
                        candidate.model,
                        candidate.credential.fingerprint(),
                        e
                    );
                    last_error = Some(e);
                }
                AttemptOutcome::Fatal(e) if self.policy == FallbackPolicy::AnyError => {
                    warn!(
                        "Model {} with credential {} failed: {}. Trying next candidate",
                        candidate.model,
                        candidate.credential.fingerprint(),
                        e
                    );
                    last_error = Some(e);
                }
                AttemptOutcome::Fatal(e) => {
                    error!(
                        "Model {} failed with a non-quota error, aborting fallback: {}",
                        candidate.model, e
                    );
                    return Err(Error::ProviderFatal {
                        model: candidate.model.clone(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }

        match last_error {
            Some(last_error) => {
                error!("All {} provider candidates exhausted", total);
                Err(Error::AllProvidersExhausted {
                    attempts: total,
                    last_error,
                })
            }
            None => Err(Error::NoProvidersConfigured),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockCompletionProvider;
    use pretty_assertions::assert_eq;

    fn candidates(n: usize) -> Vec<ProviderCandidate> {
        (0..n)
            .map(|i| ProviderCandidate {
                model: format!("model-{}", i),
                credential: Credential::new(format!("credential-{}", i)),
            })
            .collect()
    }

    fn gateway(provider: &MockCompletionProvider, policy: FallbackPolicy) -> ProviderGateway {
        ProviderGateway::new(Arc::new(provider.clone()), policy, Duration::from_secs(5))
    }

    fn payload() -> PromptPayload {
        PromptPayload::text_only("halo".to_string())
    }

    fn http_error(status: u16) -> ProviderError {
        ProviderError::Http {
            status,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_model_major_tries_every_credential_before_next_model() {
        let models = vec!["pro".to_string(), "flash".to_string()];
        let credentials = vec![Credential::new("key-a"), Credential::new("key-b")];

        let order: Vec<(String, String)> =
            resolve_candidates(&models, &credentials, CandidateOrder::ModelMajor)
                .into_iter()
                .map(|c| (c.model, c.credential.expose().to_string()))
                .collect();

        assert_eq!(
            order,
            vec![
                ("pro".to_string(), "key-a".to_string()),
                ("pro".to_string(), "key-b".to_string()),
                ("flash".to_string(), "key-a".to_string()),
                ("flash".to_string(), "key-b".to_string()),
            ]
        );
    }

    #[test]
    fn test_credential_major_tries_every_model_before_next_credential() {
        let models = vec!["pro".to_string(), "flash".to_string()];
        let credentials = vec![Credential::new("key-a"), Credential::new("key-b")];

        let order: Vec<(String, String)> =
            resolve_candidates(&models, &credentials, CandidateOrder::CredentialMajor)
                .into_iter()
                .map(|c| (c.model, c.credential.expose().to_string()))
                .collect();

        assert_eq!(
            order,
            vec![
                ("pro".to_string(), "key-a".to_string()),
                ("flash".to_string(), "key-a".to_string()),
                ("pro".to_string(), "key-b".to_string()),
                ("flash".to_string(), "key-b".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_credentials_resolves_to_no_candidates() {
        let models = vec!["flash".to_string()];
        assert!(resolve_candidates(&models, &[], CandidateOrder::ModelMajor).is_empty());
    }

    #[test]
    fn test_policy_and_order_parse() {
        assert_eq!(
            "credential-major".parse::<CandidateOrder>().unwrap(),
            CandidateOrder::CredentialMajor
        );
        assert_eq!(
            "ANY-ERROR".parse::<FallbackPolicy>().unwrap(),
            FallbackPolicy::AnyError
        );
        assert!("sideways".parse::<CandidateOrder>().is_err());
        assert!("sometimes".parse::<FallbackPolicy>().is_err());
    }

    #[test]
    fn test_timeouts_only_fall_through_when_policy_says_so() {
        let timeout = || Err(ProviderError::Timeout(Duration::from_secs(60)));

        assert!(matches!(
            AttemptOutcome::classify(timeout(), FallbackPolicy::QuotaOnly),
            AttemptOutcome::Fatal(_)
        ));
        assert!(matches!(
            AttemptOutcome::classify(timeout(), FallbackPolicy::QuotaAndTimeouts),
            AttemptOutcome::RateLimited(_)
        ));
    }

    #[test]
    fn test_blank_reply_is_not_success() {
        assert_eq!(
            AttemptOutcome::classify(Ok("  ".to_string()), FallbackPolicy::QuotaOnly),
            AttemptOutcome::Fatal(ProviderError::EmptyReply)
        );
    }

    #[tokio::test]
    async fn test_returns_first_success_after_k_quota_failures() {
        let provider = MockCompletionProvider::new()
            .with_quota_exhausted()
            .with_quota_exhausted()
            .with_reply("jawaban ketiga");
        let candidates = candidates(5);

        let reply = gateway(&provider, FallbackPolicy::QuotaOnly)
            .send(&payload(), &candidates)
            .await
            .unwrap();

        assert_eq!(reply.reply, "jawaban ketiga");
        assert_eq!(reply.attempts, 3);
        assert_eq!(reply.candidate, candidates[2]);
        assert_eq!(provider.get_call_count(), 3);

        let tried: Vec<String> = provider.calls().into_iter().map(|c| c.model).collect();
        assert_eq!(tried, vec!["model-0", "model-1", "model-2"]);
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_without_trying_other_candidates() {
        let provider = MockCompletionProvider::new().with_error(http_error(401));

        let err = gateway(&provider, FallbackPolicy::QuotaOnly)
            .send(&payload(), &candidates(3))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::ProviderFatal { ref model, attempts: 1, .. } if model == "model-0"
        ));
        assert_eq!(provider.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_fatal_error_after_quota_failures_stops_there() {
        let provider = MockCompletionProvider::new()
            .with_quota_exhausted()
            .with_error(ProviderError::Network("connection reset".to_string()));

        let err = gateway(&provider, FallbackPolicy::QuotaOnly)
            .send(&payload(), &candidates(4))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ProviderFatal { attempts: 2, .. }));
        assert_eq!(provider.get_call_count(), 2);
    }

    #[tokio::test]
    async fn test_any_error_policy_keeps_going() {
        let provider = MockCompletionProvider::new()
            .with_error(http_error(500))
            .with_error(ProviderError::Network("dns".to_string()))
            .with_reply("akhirnya");

        let reply = gateway(&provider, FallbackPolicy::AnyError)
            .send(&payload(), &candidates(3))
            .await
            .unwrap();

        assert_eq!(reply.reply, "akhirnya");
        assert_eq!(reply.attempts, 3);
    }

    #[tokio::test]
    async fn test_exhaustion_carries_last_error() {
        let provider = MockCompletionProvider::new()
            .with_quota_exhausted()
            .with_error(ProviderError::QuotaExhausted {
                status: 429,
                message: "last one".to_string(),
            });

        let err = gateway(&provider, FallbackPolicy::QuotaOnly)
            .send(&payload(), &candidates(2))
            .await
            .unwrap_err();

        match err {
            Error::AllProvidersExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 2);
                assert_eq!(
                    last_error,
                    ProviderError::QuotaExhausted {
                        status: 429,
                        message: "last one".to_string()
                    }
                );
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(provider.get_call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_candidate_list_is_a_configuration_error() {
        let provider = MockCompletionProvider::new();

        let err = gateway(&provider, FallbackPolicy::QuotaOnly)
            .send(&payload(), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoProvidersConfigured));
        assert_eq!(provider.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_provider_is_cut_off_by_call_timeout() {
        let provider = MockCompletionProvider::new().with_delay(Duration::from_millis(200));
        let gateway = ProviderGateway::new(
            Arc::new(provider.clone()),
            FallbackPolicy::QuotaOnly,
            Duration::from_millis(20),
        );

        let err = gateway.send(&payload(), &candidates(2)).await.unwrap_err();

        assert!(matches!(
            err,
            Error::ProviderFatal {
                source: ProviderError::Timeout(_),
                ..
            }
        ));
        assert_eq!(provider.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_timeouts_fall_through_under_quota_and_timeouts() {
        let provider = MockCompletionProvider::new().with_delay(Duration::from_millis(200));
        let gateway = ProviderGateway::new(
            Arc::new(provider.clone()),
            FallbackPolicy::QuotaAndTimeouts,
            Duration::from_millis(20),
        );

        let err = gateway.send(&payload(), &candidates(2)).await.unwrap_err();

        assert!(matches!(err, Error::AllProvidersExhausted { attempts: 2, .. }));
        assert_eq!(provider.get_call_count(), 2);
    }
}
