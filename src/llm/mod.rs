//! Completion client trait and implementations
//!
//! The language model is only ever asked for text. Turning that text into a
//! verdict is the extractor's job.

use crate::error::AgentError;
use crate::models::NewsItem;
use crate::Result;
use async_trait::async_trait;

pub mod together;
pub use together::TogetherClient;

/// Trait for text completion (LLM controlled)
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Text of the first completion candidate.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Human-readable model description for verdict provenance.
    fn model_info(&self) -> String;
}

/// Mock client for development & testing
/// Keeps the pipeline exercisable without network access
pub struct MockCompletionClient {
    response: Option<String>,
}

impl MockCompletionClient {
    /// Always answers with `text`.
    pub fn with_response(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
        }
    }

    /// Always fails as if the service were down.
    pub fn unavailable() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.response
            .clone()
            .ok_or_else(|| AgentError::UpstreamFailure("mock completion unavailable".to_string()))
    }

    fn model_info(&self) -> String {
        "Analysis performed by mock completion client".to_string()
    }
}

/// Build the sentiment prompt for a batch of news items.
pub fn build_sentiment_prompt(items: &[NewsItem]) -> String {
    let news_text = items
        .iter()
        .map(|item| format!("{}: {}", item.source, item.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are a market sentiment analyzer for cryptocurrency markets.

Analyze the following market news:

{}

Determine:
1. Overall sentiment (bullish, bearish, or neutral)
2. Confidence (0 to 1)
3. Score (-10 to 10, negative is bearish, positive is bullish)
4. Reasoning for the assessment
5. Key market risks

Rules:
- Return ONLY one JSON object
- No explanation text, markdown or LaTeX
- JSON format:

{{
  "sentiment": "bullish|bearish|neutral",
  "confidence": 0.75,
  "score": 5,
  "reasoning": "...",
  "risks": "..."
}}
"#,
        news_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_every_item() {
        let items = vec![
            NewsItem::new("Wire", "ETH upgrade shipped"),
            NewsItem::new("Desk", "BTC flows flat"),
        ];
        let prompt = build_sentiment_prompt(&items);

        assert!(prompt.contains("Wire: ETH upgrade shipped\n\nDesk: BTC flows flat"));
        assert!(prompt.contains("\"sentiment\": \"bullish|bearish|neutral\""));
    }

    #[test]
    fn test_mock_client() {
        let ok = MockCompletionClient::with_response("{}");
        assert_eq!(tokio_test::block_on(ok.complete("p")).unwrap(), "{}");

        let down = MockCompletionClient::unavailable();
        let err = tokio_test::block_on(down.complete("p")).unwrap_err();
        assert!(matches!(err, AgentError::UpstreamFailure(_)));
    }
}
