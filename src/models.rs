//! Core data models for the sentiment rebalancer
//!
//! Every type here is a value object: built fresh per request, never mutated
//! after construction. `Verdict` and `Allocation` can only be obtained through
//! validating constructors.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::AgentError;
use crate::Result;

/// Tolerance used when checking that allocation weights sum to one.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

//
// ================= News =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub source: String,
    pub content: String,
}

impl NewsItem {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

/// Built-in commentary used when a request does not carry its own items.
pub fn sample_news() -> Vec<NewsItem> {
    vec![
        NewsItem::new(
            "Twitter",
            "Markets showing bullish signals as tech sector surges ahead. Growth expected to continue.",
        ),
        NewsItem::new(
            "Financial News",
            "Some analysts predict a slight correction but overall positive outlook for the quarter.",
        ),
        NewsItem::new(
            "Market Report",
            "Volatility increasing as investors navigate uncertainty. Some sectors showing signs of decline.",
        ),
    ]
}

//
// ================= Sentiment =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    /// Case-insensitive parse of the three permitted literals.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "bullish" => Some(Sentiment::Bullish),
            "bearish" => Some(Sentiment::Bearish),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Bullish => "bullish",
            Sentiment::Bearish => "bearish",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Confidence =================
//

/// Confidence in `[0, 1]`. Out-of-range inputs are clamped, non-finite ones rejected.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const FULL: Confidence = Confidence(1.0);

    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() {
            Some(Self(value.clamp(0.0, 1.0)))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Rounded whole percent, as shown in allocation reasoning.
    pub fn percent(self) -> i64 {
        (self.0 * 100.0).round() as i64
    }
}

//
// ================= Verdict =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    LanguageModel,
    KeywordFallback,
}

impl Provenance {
    pub fn description(&self) -> &'static str {
        match self {
            Provenance::LanguageModel => "Analysis performed by a hosted language model",
            Provenance::KeywordFallback => "Fallback keyword analysis (language model unavailable)",
        }
    }
}

/// Structured sentiment judgment.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    sentiment: Sentiment,
    confidence: Confidence,
    score: i32,
    reasoning: String,
    risks: String,
    timestamp: DateTime<Utc>,
    provenance: Provenance,
    model_info: String,
}

impl Verdict {
    pub const MIN_SCORE: i64 = -10;
    pub const MAX_SCORE: i64 = 10;

    pub fn new(sentiment: Sentiment, confidence: Confidence, provenance: Provenance) -> Self {
        Self {
            sentiment,
            confidence,
            score: 0,
            reasoning: String::new(),
            risks: String::new(),
            timestamp: Utc::now(),
            provenance,
            model_info: provenance.description().to_string(),
        }
    }

    /// Informational score, clamped into `[-10, 10]`.
    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score.clamp(Self::MIN_SCORE, Self::MAX_SCORE) as i32;
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_risks(mut self, risks: impl Into<String>) -> Self {
        self.risks = risks.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_model_info(mut self, model_info: impl Into<String>) -> Self {
        self.model_info = model_info.into();
        self
    }

    pub fn sentiment(&self) -> Sentiment {
        self.sentiment
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn risks(&self) -> &str {
        &self.risks
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn model_info(&self) -> &str {
        &self.model_info
    }
}

//
// ================= Allocation =================
//

/// Ordered asset → weight mapping whose weights sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    weights: Vec<(String, f64)>,
}

impl Allocation {
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let weights: Vec<(String, f64)> = entries
            .into_iter()
            .map(|(asset, weight)| (asset.into(), weight))
            .collect();

        if weights.is_empty() {
            return Err(AgentError::InvalidAllocation(
                "allocation has no assets".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (asset, weight) in &weights {
            if !seen.insert(asset.as_str()) {
                return Err(AgentError::InvalidAllocation(format!(
                    "duplicate asset {}",
                    asset
                )));
            }
            if !weight.is_finite() || *weight < 0.0 || *weight > 1.0 {
                return Err(AgentError::InvalidAllocation(format!(
                    "weight for {} out of range: {}",
                    asset, weight
                )));
            }
        }

        let allocation = Self { weights };
        let total = allocation.total();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(AgentError::InvalidAllocation(format!(
                "weights sum to {} instead of 1",
                total
            )));
        }

        Ok(allocation)
    }

    pub fn equal_weight(assets: &[&str]) -> Result<Self> {
        let share = 1.0 / assets.len().max(1) as f64;
        Self::new(assets.iter().map(|a| (*a, share)))
    }

    /// Used by the policy, whose configuration already guarantees the invariant.
    pub(crate) fn from_normalized(weights: Vec<(String, f64)>) -> Self {
        Self { weights }
    }

    pub fn weight(&self, asset: &str) -> Option<f64> {
        self.weights
            .iter()
            .find(|(a, _)| a == asset)
            .map(|(_, w)| *w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(a, w)| (a.as_str(), *w))
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.weights.iter().map(|(a, _)| a.as_str())
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().map(|(_, w)| w).sum()
    }

    pub fn is_normalized(&self) -> bool {
        (self.total() - 1.0).abs() <= WEIGHT_TOLERANCE
            && self
                .weights
                .iter()
                .all(|(_, w)| w.is_finite() && (0.0..=1.0).contains(w))
    }
}

impl Serialize for Allocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.weights.len()))?;
        for (asset, weight) in &self.weights {
            map.serialize_entry(asset, weight)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Allocation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, f64>::deserialize(deserializer)?;
        Allocation::new(raw).map_err(D::Error::custom)
    }
}

//
// ================= Transactions =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub asset: String,
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
    pub chain: String,
    pub estimated_fee: f64,
    pub verification_path: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AllocationPlan {
    pub allocation: Allocation,
    pub reasoning: String,
    pub transactions: Vec<Transaction>,
}
