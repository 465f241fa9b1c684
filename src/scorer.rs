//! Keyword Fallback Scorer
//!
//! Deterministic heuristic used whenever the language model path cannot
//! produce a verdict. Total: it returns a verdict for every input, including
//! an empty item list.

use crate::models::{Confidence, NewsItem, Provenance, Sentiment, Verdict};

/// Static keyword lists, matched as lowercase substrings
const POSITIVE_KEYWORDS: &[&str] = &[
    "bullish", "growth", "positive", "surge", "gain", "up", "rising",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "bearish", "decline", "negative", "crash", "loss", "down", "falling",
];

/// Net keyword count at which confidence saturates.
const CONFIDENCE_SCALE: f64 = 5.0;

const FALLBACK_REASONING: &str = "Fallback analysis based on keyword matching";
const FALLBACK_RISKS: &str = "Unable to perform detailed risk analysis";

/// Keyword scorer
pub struct FallbackScorer;

impl FallbackScorer {
    /// Score the combined content of all items.
    pub fn score(items: &[NewsItem]) -> Verdict {
        let text = items
            .iter()
            .map(|item| item.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .to_lowercase();

        let score = keyword_score(&text);

        let sentiment = if score > 0 {
            Sentiment::Bullish
        } else if score < 0 {
            Sentiment::Bearish
        } else {
            Sentiment::Neutral
        };

        let confidence = Confidence::new((score.unsigned_abs() as f64 / CONFIDENCE_SCALE).min(1.0))
            .unwrap_or(Confidence::ZERO);

        Verdict::new(sentiment, confidence, Provenance::KeywordFallback)
            .with_score(score)
            .with_reasoning(FALLBACK_REASONING)
            .with_risks(FALLBACK_RISKS)
    }
}

/// Positive occurrences minus negative occurrences. Matches are plain
/// substrings, so "up" also counts inside "upgrade".
fn keyword_score(text: &str) -> i64 {
    let count = |keywords: &[&str]| -> i64 {
        keywords
            .iter()
            .map(|kw| text.matches(*kw).count() as i64)
            .sum()
    };

    count(POSITIVE_KEYWORDS) - count(NEGATIVE_KEYWORDS)
}
