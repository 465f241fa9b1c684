//! Sentiment agent - composes the full pipeline
//!
//! NEWS → PROMPT → COMPLETE → EXTRACT | FALLBACK → PLAN → DIFF → RECORD
//!
//! Only the completion call can fail transiently; it is bounded by a timeout
//! and retried, and any failure routes to the keyword fallback. The pipeline
//! therefore always yields a verdict and a plan.

use crate::audit::{DecisionLog, DecisionRecord};
use crate::differ::TransactionDiffer;
use crate::error::AgentError;
use crate::extractor::extract;
use crate::llm::{build_sentiment_prompt, CompletionClient};
use crate::models::{Allocation, AllocationPlan, NewsItem, Provenance, Verdict};
use crate::policy::AllocationPolicy;
use crate::scorer::FallbackScorer;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 1;

/// Everything produced for one analysis request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub analysis_id: Uuid,
    pub market_data: Vec<NewsItem>,
    pub sentiment_analysis: Verdict,
    pub allocation_plan: AllocationPlan,
    pub decision_record: DecisionRecord,
    pub execution_time_ms: u64,
}

/// Extract a verdict from the completion, or score the items when the
/// completion failed or held nothing usable. Total.
pub fn resolve_verdict(completion: Result<String>, items: &[NewsItem]) -> Verdict {
    let extracted = completion.and_then(|text| extract(&text).map_err(AgentError::from));

    match extracted {
        Ok(verdict) => verdict,
        Err(e) => {
            if e.is_recoverable() {
                warn!(error = %e, "No model verdict - using keyword fallback");
            } else {
                error!(error = %e, "Completion client misbehaved - using keyword fallback");
            }
            FallbackScorer::score(items)
        }
    }
}

/// Verdict → plan. Fails only when the target allocation breaks its invariant.
pub fn decide(
    policy: &AllocationPolicy,
    differ: &TransactionDiffer,
    verdict: &Verdict,
    current: &Allocation,
) -> Result<AllocationPlan> {
    let allocation = policy.plan(verdict);

    if !allocation.is_normalized() {
        return Err(AgentError::InvariantViolation(format!(
            "target allocation sums to {}",
            allocation.total()
        )));
    }

    let transactions = differ.diff(current, &allocation);

    Ok(AllocationPlan {
        reasoning: policy.reasoning(verdict),
        allocation,
        transactions,
    })
}

pub struct SentimentAgent {
    client: Arc<dyn CompletionClient>,
    policy: AllocationPolicy,
    differ: TransactionDiffer,
    decisions: DecisionLog,
    timeout: Duration,
    max_retries: u32,
}

impl SentimentAgent {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        policy: AllocationPolicy,
        differ: TransactionDiffer,
        decisions: DecisionLog,
    ) -> Self {
        Self {
            client,
            policy,
            differ,
            decisions,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_retry_policy(mut self, timeout: Duration, max_retries: u32) -> Self {
        self.timeout = timeout;
        self.max_retries = max_retries;
        self
    }

    pub fn decisions(&self) -> &DecisionLog {
        &self.decisions
    }

    /// Holdings assumed when the caller supplies none.
    pub fn default_holdings(&self) -> Allocation {
        self.policy.config().baseline_allocation()
    }

    /// Run the pipeline for `items` against `current` holdings.
    pub async fn analyze(&self, items: Vec<NewsItem>, current: &Allocation) -> Result<AnalysisOutcome> {
        let start = Instant::now();
        let analysis_id = Uuid::new_v4();

        info!(
            analysis_id = %analysis_id,
            item_count = items.len(),
            "Starting sentiment analysis"
        );

        let prompt = build_sentiment_prompt(&items);
        let completion = self.request_completion(&prompt).await;

        let verdict = resolve_verdict(completion, &items);
        let verdict = match verdict.provenance() {
            Provenance::LanguageModel => verdict.with_model_info(self.client.model_info()),
            Provenance::KeywordFallback => verdict,
        };

        info!(
            analysis_id = %analysis_id,
            sentiment = %verdict.sentiment(),
            confidence = verdict.confidence().value(),
            provenance = ?verdict.provenance(),
            "Verdict resolved"
        );

        let plan = decide(&self.policy, &self.differ, &verdict, current)?;

        let record = DecisionRecord::new(&verdict, &plan);
        self.decisions.record(record.clone()).await?;

        info!(
            analysis_id = %analysis_id,
            decision_id = %record.decision_id,
            transactions = plan.transactions.len(),
            "Allocation plan ready"
        );

        Ok(AnalysisOutcome {
            analysis_id,
            market_data: items,
            sentiment_analysis: verdict,
            allocation_plan: plan,
            decision_record: record,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Completion with a per-attempt timeout and `max_retries` extra attempts.
    async fn request_completion(&self, prompt: &str) -> Result<String> {
        let mut last_error = AgentError::UpstreamFailure("no completion attempted".to_string());

        for attempt in 0..=self.max_retries {
            match tokio::time::timeout(self.timeout, self.client.complete(prompt)).await {
                Ok(Ok(text)) => {
                    debug!(attempt, chars = text.len(), "Completion succeeded");
                    return Ok(text);
                }
                Ok(Err(e)) => {
                    warn!(attempt, error = %e, "Completion attempt failed");
                    last_error = e;
                }
                Err(_) => {
                    warn!(attempt, timeout_ms = self.timeout.as_millis() as u64, "Completion attempt timed out");
                    last_error = AgentError::UpstreamFailure(format!(
                        "completion timed out after {:?}",
                        self.timeout
                    ));
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletionClient;
    use crate::models::{sample_news, Sentiment, TradeSide};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn agent(client: Arc<dyn CompletionClient>) -> SentimentAgent {
        SentimentAgent::new(
            client,
            AllocationPolicy::default(),
            TransactionDiffer::default(),
            DecisionLog::new(),
        )
    }

    /// Fails a fixed number of times, then answers.
    struct FlakyClient {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl CompletionClient for FlakyClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(AgentError::UpstreamFailure("503".to_string()))
            } else {
                Ok(r#"{"sentiment":"bearish","confidence":0.5}"#.to_string())
            }
        }

        fn model_info(&self) -> String {
            "flaky".to_string()
        }
    }

    struct SlowClient;

    #[async_trait]
    impl CompletionClient for SlowClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(r#"{"sentiment":"bullish","confidence":1}"#.to_string())
        }

        fn model_info(&self) -> String {
            "slow".to_string()
        }
    }

    #[test]
    fn test_end_to_end_bullish_decision() {
        let verdict = resolve_verdict(
            Ok(r#"{"sentiment":"bullish","confidence":1.0}"#.to_string()),
            &[],
        );
        let policy = AllocationPolicy::default();
        let current = policy.config().baseline_allocation();
        let plan = decide(&policy, &TransactionDiffer::default(), &verdict, &current).unwrap();

        let summary: Vec<(TradeSide, &str, f64)> = plan
            .transactions
            .iter()
            .map(|t| (t.side, t.asset.as_str(), t.amount_usd))
            .collect();
        assert_eq!(
            summary,
            vec![
                (TradeSide::Sell, "BTC", 10000.0),
                (TradeSide::Buy, "ETH", 10000.0),
                (TradeSide::Buy, "NEAR", 5000.0),
                (TradeSide::Sell, "SOL", 5000.0),
            ]
        );
        assert!((plan.allocation.weight("NEAR").unwrap() - 0.30).abs() < 1e-12);
        assert!(plan.reasoning.contains("100% confidence"));
    }

    #[test]
    fn test_resolve_verdict_falls_back() {
        let items = vec![NewsItem::new("x", "bullish growth positive")];

        let from_garbage = resolve_verdict(Ok("I cannot help with that.".to_string()), &items);
        assert_eq!(from_garbage.provenance(), Provenance::KeywordFallback);
        assert_eq!(from_garbage.score(), 3);

        let from_outage = resolve_verdict(Err(AgentError::UpstreamFailure("down".into())), &items);
        assert_eq!(from_outage.provenance(), Provenance::KeywordFallback);
        assert_eq!(from_outage.sentiment(), Sentiment::Bullish);
    }

    #[tokio::test]
    async fn test_analyze_with_model_verdict() {
        let client = Arc::new(MockCompletionClient::with_response(
            "Here you go: {\"sentiment\":\"bearish\",\"confidence\":0.4,\"score\":-2}",
        ));
        let agent = agent(client);
        let current = agent.default_holdings();

        let outcome = agent.analyze(sample_news(), &current).await.unwrap();

        assert_eq!(outcome.sentiment_analysis.sentiment(), Sentiment::Bearish);
        assert_eq!(
            outcome.sentiment_analysis.model_info(),
            "Analysis performed by mock completion client"
        );
        assert_eq!(outcome.market_data.len(), 3);
        assert!(agent
            .decisions()
            .verify_integrity(outcome.decision_record.decision_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_analyze_survives_outage() {
        let agent = agent(Arc::new(MockCompletionClient::unavailable()));
        let current = agent.default_holdings();

        let outcome = agent.analyze(vec![], &current).await.unwrap();

        assert_eq!(outcome.sentiment_analysis.provenance(), Provenance::KeywordFallback);
        assert_eq!(outcome.sentiment_analysis.sentiment(), Sentiment::Neutral);
        assert!(outcome.allocation_plan.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_single_retry_recovers() {
        let client = Arc::new(FlakyClient {
            failures: 1,
            calls: AtomicU32::new(0),
        });
        let agent = agent(client.clone());
        let current = agent.default_holdings();

        let outcome = agent.analyze(sample_news(), &current).await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.sentiment_analysis.provenance(), Provenance::LanguageModel);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let client = Arc::new(FlakyClient {
            failures: 10,
            calls: AtomicU32::new(0),
        });
        let agent = agent(client.clone());
        let current = agent.default_holdings();

        let outcome = agent.analyze(sample_news(), &current).await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.sentiment_analysis.provenance(), Provenance::KeywordFallback);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_routes_to_fallback() {
        let agent = agent(Arc::new(SlowClient)).with_retry_policy(Duration::from_millis(50), 0);
        let current = agent.default_holdings();

        let outcome = agent.analyze(sample_news(), &current).await.unwrap();

        assert_eq!(outcome.sentiment_analysis.provenance(), Provenance::KeywordFallback);
    }
}
