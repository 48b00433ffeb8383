//! # Relevance Classifier Module
//!
//! Decides whether a scraped candidate actually matches the search term it
//! was found for, by asking a text-generation service for a structured
//! verdict.
//!
//! ## Key Components
//!
//! - `Classifier`: runs the judgement with bounded retries and fallbacks
//! - `JudgementService`: the seam to the external model (`OllamaClient` in
//!   production, `MockJudge` in tests)
//! - `RateLimitedJudge`: client-side quota around any service
//! - `parse_judgement`: structured parse with keyword-heuristic fallback
//!
//! ## Guarantees
//!
//! `classify` never fails. An unreachable service yields an `AI_ERROR`
//! annotation, an unreadable answer goes through the heuristic, and disabled
//! validation short-circuits without any call.
//!
//! Clones of a `Classifier` share one pool of `max_in_flight` permits, so
//! the bound holds across every producer of a run. An attempt's timeout only
//! starts once it holds a permit.

mod config;
mod error;
pub mod mock;
mod ollama;
mod parse;
mod prompt;
mod ratelimited;

pub use config::{ClassifierConfig, ClassifierConfigBuilder, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use error::ClassifyError;
pub use ollama::OllamaClient;
pub use parse::{AFFIRMATIVE, Judgement, extract_payload, parse_judgement};
pub use prompt::build_prompt;
pub use ratelimited::RateLimitedJudge;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use crate::record::{Annotation, ClassifiedRecord, MatchRecord, Status, Verdict};

/// Rationale used when validation is switched off
pub const DISABLED_RATIONALE: &str = "AI validation is disabled";

/// Rationale used when term or name is empty
pub const MISSING_FIELD_RATIONALE: &str = "missing required field";

/// Rationale used when every attempt failed
pub const UNAVAILABLE_RATIONALE: &str = "AI unavailable (fallback)";

/// Future returned by a judgement service
pub type JudgementFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, ClassifyError>> + Send + 'a>>;

/// A text-generation service that answers one prompt with free text
pub trait JudgementService: Send + Sync {
    fn generate<'a>(&'a self, model: &'a str, prompt: &'a str) -> JudgementFuture<'a>;
}

/// Relevance classifier
#[derive(Clone)]
pub struct Classifier {
    service: Arc<dyn JudgementService>,
    config: ClassifierConfig,
    permits: Arc<Semaphore>,
}

impl Classifier {
    pub fn new(service: Arc<dyn JudgementService>, config: ClassifierConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        Self {
            service,
            config,
            permits,
        }
    }

    /// Classifier backed by a rate-limited Ollama client
    pub fn ollama(config: ClassifierConfig) -> Result<Self, ClassifyError> {
        let client = OllamaClient::new(&config)?;
        let service = RateLimitedJudge::per_minute(client, config.requests_per_minute);
        Ok(Self::new(Arc::new(service), config))
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Annotate a match record. The record itself is carried through untouched.
    pub async fn classify(&self, record: MatchRecord, ai_enabled: bool) -> ClassifiedRecord {
        let annotation = self
            .judge(
                &record.search_term,
                record.name_str(),
                record.price_str(),
                &record.store,
                ai_enabled,
            )
            .await;
        ClassifiedRecord::new(record, annotation)
    }

    /// Judge one candidate against the search term
    #[instrument(skip(self, price, store))]
    pub async fn judge(
        &self,
        search_term: &str,
        candidate_name: &str,
        price: &str,
        store: &str,
        ai_enabled: bool,
    ) -> Annotation {
        if !ai_enabled {
            return Annotation {
                verdict: Verdict::Disabled,
                score: 0,
                rationale: DISABLED_RATIONALE.to_string(),
                status: Status::AiDisabled,
            };
        }

        if search_term.trim().is_empty() || candidate_name.trim().is_empty() {
            return Annotation {
                verdict: Verdict::Error,
                score: 0,
                rationale: MISSING_FIELD_RATIONALE.to_string(),
                status: Status::AiError,
            };
        }

        let prompt = build_prompt(search_term, candidate_name, price, store);
        let response = match self.ask(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Relevance check failed for {:?}: {}", candidate_name, e);
                return Annotation {
                    verdict: Verdict::Error,
                    score: 0,
                    rationale: UNAVAILABLE_RATIONALE.to_string(),
                    status: Status::AiError,
                };
            }
        };

        let judgement = parse_judgement(&response);
        let status = Status::from_judgement(
            judgement.verdict,
            judgement.score,
            self.config.accept_threshold,
        );
        info!(
            "AI: {} -> {} ({}) - {}",
            candidate_name, judgement.verdict, judgement.score, judgement.rationale
        );

        Annotation {
            verdict: judgement.verdict,
            score: judgement.score,
            rationale: judgement.rationale,
            status,
        }
    }

    /// Call the service with bounded attempts, each under its own timeout,
    /// pausing `backoff` between attempts.
    pub async fn ask(&self, prompt: &str) -> Result<String, ClassifyError> {
        let attempts = self.config.attempts();
        let mut last_error = ClassifyError::Other("no attempt made".to_string());

        for attempt in 1..=attempts {
            let result = match self.permits.acquire().await {
                Ok(_permit) => self.attempt(prompt).await,
                Err(e) => Err(ClassifyError::Other(format!("permits closed: {}", e))),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("Judgement call failed ({}/{}): {}", attempt, attempts, e);
                    last_error = e;
                }
            }

            if attempt < attempts && !self.config.backoff.is_zero() {
                tokio::time::sleep(self.config.backoff).await;
            }
        }

        Err(ClassifyError::Unavailable {
            attempts,
            last: last_error.to_string(),
        })
    }

    async fn attempt(&self, prompt: &str) -> Result<String, ClassifyError> {
        let call = self.service.generate(&self.config.model, prompt);
        match tokio::time::timeout(self.config.attempt_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ClassifyError::Timeout(self.config.attempt_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::mock::{MockJudge, MockReply};
    use std::time::Duration;

    fn classifier(judge: MockJudge) -> Classifier {
        let config = ClassifierConfig::builder()
            .backoff(Duration::ZERO)
            .attempt_timeout(Duration::from_millis(200))
            .build();
        Classifier::new(Arc::new(judge), config)
    }

    fn hammer() -> MatchRecord {
        MatchRecord::new(
            "Bauhaus",
            "hammer",
            Some("Claw Hammer 500g".into()),
            Some("2990".into()),
            Some("http://x/1".into()),
        )
    }

    #[tokio::test]
    async fn test_disabled_skips_service() {
        let judge = MockJudge::replying(r#"{"relevant": "YES", "score": 99}"#);
        let classifier = classifier(judge.clone());

        let classified = classifier.classify(hammer(), false).await;
        let annotation = classified.annotation.unwrap();
        assert_eq!(annotation.status, Status::AiDisabled);
        assert_eq!(annotation.verdict, Verdict::Disabled);
        assert_eq!(annotation.score, 0);
        assert_eq!(annotation.rationale, DISABLED_RATIONALE);
        assert_eq!(judge.calls(), 0);
        assert_eq!(classified.record, hammer());
    }

    #[tokio::test]
    async fn test_disabled_wins_over_missing_name() {
        let judge = MockJudge::replying("YES");
        let classifier = classifier(judge.clone());

        let annotation = classifier.judge("hammer", "", "1", "OBI", false).await;
        assert_eq!(annotation.status, Status::AiDisabled);
        assert_eq!(annotation.verdict, Verdict::Disabled);
        assert_eq!(annotation.rationale, DISABLED_RATIONALE);
        assert_eq!(judge.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_name_never_calls_service() {
        let judge = MockJudge::replying("YES");
        let classifier = classifier(judge.clone());

        let annotation = classifier.judge("hammer", "  ", "10", "OBI", true).await;
        assert_eq!(annotation.status, Status::AiError);
        assert_eq!(annotation.rationale, MISSING_FIELD_RATIONALE);

        let annotation = classifier.judge("", "Claw", "10", "OBI", true).await;
        assert_eq!(annotation.status, Status::AiError);
        assert_eq!(judge.calls(), 0);
    }

    #[tokio::test]
    async fn test_accepted_above_threshold() {
        let judge =
            MockJudge::replying(r#"{"relevant": "YES", "score": 60, "rationale": "same"}"#);
        let annotation = classifier(judge)
            .judge("hammer", "Claw Hammer", "2990", "OBI", true)
            .await;
        assert_eq!(annotation.verdict, Verdict::Relevant);
        assert_eq!(annotation.status, Status::Accepted);
        assert_eq!(annotation.rationale, "same");
    }

    #[tokio::test]
    async fn test_relevant_below_threshold_is_rejected() {
        let judge = MockJudge::replying(r#"{"relevant": "YES", "score": 59}"#);
        let annotation = classifier(judge)
            .judge("hammer", "Claw Hammer", "2990", "OBI", true)
            .await;
        assert_eq!(annotation.verdict, Verdict::Relevant);
        assert_eq!(annotation.status, Status::RejectedByAi);
    }

    #[tokio::test]
    async fn test_heuristic_tier_feeds_status() {
        let judge = MockJudge::replying("I would say YES.");
        let annotation = classifier(judge)
            .judge("hammer", "Claw Hammer", "2990", "OBI", true)
            .await;
        assert_eq!(annotation.score, 80);
        assert_eq!(annotation.status, Status::Accepted);
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let judge = MockJudge::scripted(vec![
            MockReply::Failure("boom".into()),
            MockReply::Text(r#"{"relevant": "NO", "score": 10}"#.into()),
        ]);
        let annotation = classifier(judge.clone())
            .judge("hammer", "Screwdriver", "990", "OBI", true)
            .await;
        assert_eq!(judge.calls(), 2);
        assert_eq!(annotation.verdict, Verdict::NotRelevant);
        assert_eq!(annotation.status, Status::RejectedByAi);
    }

    #[tokio::test]
    async fn test_all_attempts_fail_falls_back() {
        let judge = MockJudge::failing();
        let classified = classifier(judge.clone()).classify(hammer(), true).await;
        let annotation = classified.annotation.unwrap();
        assert_eq!(judge.calls(), 2);
        assert_eq!(annotation.verdict, Verdict::Error);
        assert_eq!(annotation.status, Status::AiError);
        assert_eq!(annotation.score, 0);
        assert_eq!(annotation.rationale, UNAVAILABLE_RATIONALE);
        assert_eq!(classified.record, hammer());
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let judge = MockJudge::replying("YES").with_delay(Duration::from_secs(5));
        let classifier = classifier(judge.clone());

        let result = classifier.ask("prompt").await;
        assert!(matches!(
            result,
            Err(ClassifyError::Unavailable { attempts: 2, .. })
        ));
        assert_eq!(judge.calls(), 2);
    }

    #[tokio::test]
    async fn test_queued_calls_do_not_time_out() {
        let judge = MockJudge::replying(r#"{"relevant": "YES", "score": 90}"#)
            .with_delay(Duration::from_millis(50));
        let config = ClassifierConfig::builder()
            .backoff(Duration::ZERO)
            .attempt_timeout(Duration::from_millis(200))
            .max_in_flight(1)
            .build();
        let classifier = Classifier::new(Arc::new(judge.clone()), config);

        let calls = (0..6).map(|_| {
            let classifier = classifier.clone();
            async move {
                classifier
                    .judge("hammer", "Claw Hammer", "2990", "OBI", true)
                    .await
            }
        });
        let annotations = futures::future::join_all(calls).await;

        assert!(annotations.iter().all(|a| a.status == Status::Accepted));
        assert_eq!(judge.calls(), 6);
        assert_eq!(judge.peak_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_bound_is_shared_by_clones() {
        let judge = MockJudge::replying("YES").with_delay(Duration::from_millis(20));
        let config = ClassifierConfig::builder()
            .backoff(Duration::ZERO)
            .max_in_flight(3)
            .build();
        let classifier = Classifier::new(Arc::new(judge.clone()), config);

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let classifier = classifier.clone();
                tokio::spawn(async move { classifier.classify(hammer(), true).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(judge.calls(), 12);
        assert!(judge.peak_in_flight() <= 3);
    }
}
