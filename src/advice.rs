//! Advice generation pipeline
//!
//! LOAD → AGGREGATE → RENDER PROMPT → GENERATE → ANSWER
//!
//! The upstream call is the only step that waits on the network. It gets a
//! single attempt under a timeout, and nothing is written to the repository
//! once the prompt exists, so an abandoned request leaves no trace.

use crate::aggregator::FinancialAggregator;
use crate::completion::{CompletionRequest, OpenAiClient, TextGenerator};
use crate::config::AdviceSettings;
use crate::error::FinanceError;
use crate::models::Advice;
use crate::prompt::AdvicePromptBuilder;
use crate::repository::FinancialRepository;
use crate::Result;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Returned when the upstream answered without any completion
pub const NO_ADVICE_SENTINEL: &str = "No advice generated.";

pub struct AdviceService {
    repo: Arc<dyn FinancialRepository>,
    /// `None` when no API key is configured.
    generator: Option<Arc<dyn TextGenerator>>,
    settings: AdviceSettings,
}

impl AdviceService {
    pub fn new(
        repo: Arc<dyn FinancialRepository>,
        generator: Option<Arc<dyn TextGenerator>>,
        settings: AdviceSettings,
    ) -> Self {
        Self {
            repo,
            generator,
            settings,
        }
    }

    /// Wire up the HTTP client when an API key is configured.
    pub fn from_settings(
        repo: Arc<dyn FinancialRepository>,
        settings: AdviceSettings,
    ) -> Result<Self> {
        let generator = match &settings.api_key {
            Some(key) => {
                let client = OpenAiClient::new(key.clone(), &settings.base_url, settings.timeout)?;
                Some(Arc::new(client) as Arc<dyn TextGenerator>)
            }
            None => {
                warn!("OPENAI_API_KEY not set; advice requests will fail until it is configured");
                None
            }
        };

        Ok(Self::new(repo, generator, settings))
    }

    pub async fn generate_advice(&self, user_id: Uuid) -> Result<Advice> {
        let snapshot = self
            .repo
            .load_snapshot(user_id)
            .await?
            .ok_or(FinanceError::UserNotFound)?;

        let generator = self
            .generator
            .as_ref()
            .ok_or(FinanceError::ServiceUnauthorized)?;

        let metrics = FinancialAggregator::aggregate(&snapshot);
        let prompt = AdvicePromptBuilder::render(&metrics);

        debug!(
            %user_id,
            prompt_hash = %prompt_fingerprint(&prompt),
            prompt_len = prompt.len(),
            "Advice prompt rendered"
        );

        let request = CompletionRequest {
            prompt,
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.settings.timeout, generator.generate(&request)).await;

        let completion = match outcome {
            Ok(Ok(completion)) => completion,
            Ok(Err(FinanceError::UpstreamFailure(detail))) => {
                return Err(FinanceError::UpstreamFailure(detail));
            }
            Ok(Err(other)) => return Err(FinanceError::UpstreamFailure(other.to_string())),
            Err(_) => {
                return Err(FinanceError::UpstreamFailure(format!(
                    "no response within {:?}",
                    self.settings.timeout
                )));
            }
        };

        info!(
            %user_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            has_completion = completion.is_some(),
            "Advice generated"
        );

        Ok(Advice {
            text: completion.unwrap_or_else(|| NO_ADVICE_SENTINEL.to_string()),
        })
    }
}

/// SHA-256 of the prompt, hex encoded. Lets logs correlate requests without
/// writing anyone's finances to disk.
pub fn prompt_fingerprint(prompt: &str) -> String {
    hex::encode(Sha256::digest(prompt.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::StubGenerator;
    use crate::models::{DebtInput, NewExpense, ProfileUpdate};
    use crate::repository::InMemoryRepository;
    use chrono::NaiveDate;
    use std::time::Duration;

    async fn seeded_user(repo: &InMemoryRepository) -> Uuid {
        let user = repo.create_user("a@x.com", "hash").await.unwrap();
        repo.update_profile(
            user.id,
            &ProfileUpdate {
                income: Some(Some(1000.0)),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();
        repo.insert_expense(
            user.id,
            NewExpense {
                amount: 200.0,
                category: "food".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            },
        )
        .await
        .unwrap();
        user.id
    }

    fn service(
        repo: &InMemoryRepository,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> AdviceService {
        AdviceService::new(Arc::new(repo.clone()), generator, AdviceSettings::default())
    }

    #[tokio::test]
    async fn test_prompt_sent_upstream_and_completion_returned() {
        let repo = InMemoryRepository::new();
        let user_id = seeded_user(&repo).await;
        let stub = Arc::new(StubGenerator::replying(Some("Put 50% toward savings.")));

        let advice = service(&repo, Some(stub.clone()))
            .generate_advice(user_id)
            .await
            .unwrap();
        assert_eq!(advice.text, "Put 50% toward savings.");

        let requests = stub.requests().await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.prompt.contains("$1000"));
        assert!(request.prompt.contains("$200"));
        assert!(request.prompt.contains("disposable income of $800"));
        assert!(request.prompt.contains("food: $200."));
        assert!(!request.prompt.contains("total debt"));
        assert!(!request.prompt.contains("savings goals add up"));
        assert_eq!(request.model, crate::config::DEFAULT_ADVICE_MODEL);
        assert_eq!(request.max_tokens, crate::config::DEFAULT_ADVICE_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_sentinel_when_no_completion() {
        let repo = InMemoryRepository::new();
        let user_id = seeded_user(&repo).await;

        let advice = service(&repo, Some(Arc::new(StubGenerator::replying(None))))
            .generate_advice(user_id)
            .await
            .unwrap();
        assert_eq!(advice.text, NO_ADVICE_SENTINEL);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let repo = InMemoryRepository::new();
        let result = service(&repo, Some(Arc::new(StubGenerator::replying(Some("x")))))
            .generate_advice(Uuid::new_v4())
            .await;
        assert!(matches!(result, Err(FinanceError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let repo = InMemoryRepository::new();
        let user_id = seeded_user(&repo).await;

        let result = service(&repo, None).generate_advice(user_id).await;
        assert!(matches!(result, Err(FinanceError::ServiceUnauthorized)));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_reported() {
        let repo = InMemoryRepository::new();
        let user_id = seeded_user(&repo).await;

        let result = service(&repo, Some(Arc::new(StubGenerator::failing())))
            .generate_advice(user_id)
            .await;
        assert!(matches!(result, Err(FinanceError::UpstreamFailure(_))));
    }

    #[tokio::test]
    async fn test_upstream_timeout_is_reported() {
        let repo = InMemoryRepository::new();
        let user_id = seeded_user(&repo).await;
        let stub = StubGenerator::replying(Some("late")).with_delay(Duration::from_secs(5));
        let settings = AdviceSettings {
            timeout: Duration::from_millis(20),
            ..AdviceSettings::default()
        };

        let result = AdviceService::new(Arc::new(repo.clone()), Some(Arc::new(stub)), settings)
            .generate_advice(user_id)
            .await;
        assert!(matches!(result, Err(FinanceError::UpstreamFailure(_))));
    }

    #[tokio::test]
    async fn test_debt_clause_follows_profile() {
        let repo = InMemoryRepository::new();
        let user_id = seeded_user(&repo).await;
        repo.update_profile(
            user_id,
            &ProfileUpdate {
                debts: Some(vec![DebtInput {
                    amount: Some(2500.0),
                    interest_rate: Some(18.0),
                }]),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();

        let stub = Arc::new(StubGenerator::replying(Some("ok")));
        service(&repo, Some(stub.clone()))
            .generate_advice(user_id)
            .await
            .unwrap();

        let requests = stub.requests().await;
        assert!(requests[0].prompt.contains("total debt of $2500."));
    }

    #[test]
    fn test_prompt_fingerprint_is_stable() {
        let a = prompt_fingerprint("My monthly income is $1000.");
        assert_eq!(a.len(), 64);
        assert_eq!(a, prompt_fingerprint("My monthly income is $1000."));
        assert_ne!(a, prompt_fingerprint("My monthly income is $1001."));
    }
}
