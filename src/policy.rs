//! Allocation policy
//!
//! Maps a verdict to target weights. Each asset moves linearly away from its
//! baseline by `tilt * confidence`, with one tilt column per directional
//! sentiment. The configuration is validated once at construction so that
//! `plan` stays total.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::AgentError;
use crate::models::{Allocation, Sentiment, Verdict, WEIGHT_TOLERANCE};
use crate::Result;

/// One row of the coefficient table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetPolicy {
    pub symbol: String,
    pub baseline: f64,
    pub bullish_tilt: f64,
    pub bearish_tilt: f64,
}

impl AssetPolicy {
    pub fn new(symbol: impl Into<String>, baseline: f64, bullish_tilt: f64, bearish_tilt: f64) -> Self {
        Self {
            symbol: symbol.into(),
            baseline,
            bullish_tilt,
            bearish_tilt,
        }
    }

    fn tilt(&self, sentiment: Sentiment) -> f64 {
        match sentiment {
            Sentiment::Bullish => self.bullish_tilt,
            Sentiment::Bearish => self.bearish_tilt,
            Sentiment::Neutral => 0.0,
        }
    }
}

/// Validated asset universe and coefficient table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PolicyConfig {
    assets: Vec<AssetPolicy>,
}

impl PolicyConfig {
    /// Rejects tables whose baseline does not sum to one, whose tilt columns do
    /// not cancel, or whose weights leave `[0, 1]` anywhere in the confidence range.
    pub fn new(assets: Vec<AssetPolicy>) -> Result<Self> {
        if assets.is_empty() {
            return Err(AgentError::ConfigError(
                "policy needs at least one asset".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for asset in &assets {
            if !seen.insert(asset.symbol.as_str()) {
                return Err(AgentError::ConfigError(format!(
                    "duplicate asset {} in policy",
                    asset.symbol
                )));
            }
            for value in [asset.baseline, asset.bullish_tilt, asset.bearish_tilt] {
                if !value.is_finite() {
                    return Err(AgentError::ConfigError(format!(
                        "non-finite coefficient for {}",
                        asset.symbol
                    )));
                }
            }
        }

        // Each end of the confidence range gets half the tolerance, so every
        // interpolated plan stays within it.
        let edge_tolerance = WEIGHT_TOLERANCE / 2.0;

        let baseline: f64 = assets.iter().map(|a| a.baseline).sum();
        if (baseline - 1.0).abs() > edge_tolerance {
            return Err(AgentError::ConfigError(format!(
                "baseline weights sum to {}",
                baseline
            )));
        }

        for sentiment in [Sentiment::Bullish, Sentiment::Bearish] {
            let at_full: f64 = assets.iter().map(|a| a.baseline + a.tilt(sentiment)).sum();
            if (at_full - 1.0).abs() > edge_tolerance {
                return Err(AgentError::ConfigError(format!(
                    "{} tilts do not cancel (full-confidence weights sum to {})",
                    sentiment, at_full
                )));
            }

            // Weights are linear in confidence, so checking both ends covers [0, 1].
            for asset in &assets {
                let at_full = asset.baseline + asset.tilt(sentiment);
                for weight in [asset.baseline, at_full] {
                    if !(0.0..=1.0).contains(&weight) {
                        return Err(AgentError::ConfigError(format!(
                            "{} weight for {} leaves [0, 1]: {}",
                            sentiment, asset.symbol, weight
                        )));
                    }
                }
            }
        }

        Ok(Self { assets })
    }

    pub fn assets(&self) -> &[AssetPolicy] {
        &self.assets
    }

    /// The neutral allocation, also used as the default current holdings.
    pub fn baseline_allocation(&self) -> Allocation {
        Allocation::from_normalized(
            self.assets
                .iter()
                .map(|a| (a.symbol.clone(), a.baseline))
                .collect(),
        )
    }
}

impl Default for PolicyConfig {
    /// Equal-weight BTC/ETH/NEAR/SOL. Bullish rotates from BTC and SOL into ETH
    /// and NEAR; bearish rotates from NEAR and SOL into BTC and ETH.
    fn default() -> Self {
        Self {
            assets: vec![
                AssetPolicy::new("BTC", 0.25, -0.10, 0.15),
                AssetPolicy::new("ETH", 0.25, 0.10, 0.05),
                AssetPolicy::new("NEAR", 0.25, 0.05, -0.10),
                AssetPolicy::new("SOL", 0.25, -0.05, -0.10),
            ],
        }
    }
}

impl<'de> Deserialize<'de> for PolicyConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            assets: Vec<AssetPolicy>,
        }

        let raw = Raw::deserialize(deserializer)?;
        PolicyConfig::new(raw.assets).map_err(serde::de::Error::custom)
    }
}

/// Verdict → target allocation.
#[derive(Debug, Clone, Default)]
pub struct AllocationPolicy {
    config: PolicyConfig,
}

impl AllocationPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn plan(&self, verdict: &Verdict) -> Allocation {
        let c = verdict.confidence().value();
        let sentiment = verdict.sentiment();

        let weights = self
            .config
            .assets
            .iter()
            .map(|a| (a.symbol.clone(), a.baseline + a.tilt(sentiment) * c))
            .collect();

        Allocation::from_normalized(weights)
    }

    pub fn reasoning(&self, verdict: &Verdict) -> String {
        let focus = match verdict.sentiment() {
            Sentiment::Bullish => "higher growth potential",
            Sentiment::Bearish => "capital preservation",
            Sentiment::Neutral => "balanced returns",
        };

        format!(
            "Based on {} sentiment with {}% confidence, adjusting portfolio for {}.",
            verdict.sentiment(),
            verdict.confidence().percent(),
            focus
        )
    }
}
