//! Transaction differ
//!
//! Converts an allocation change into the trades needed to reach it.

use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::models::{Allocation, TradeSide, Transaction};
use crate::Result;

pub const DEFAULT_NOTIONAL_USD: f64 = 100_000.0;
pub const DEFAULT_MATERIALITY_USD: f64 = 100.0;
pub const DEFAULT_VERIFICATION_NETWORK: &str = "NEAR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiffConfig {
    /// Portfolio value used to turn weights into dollars.
    pub notional_usd: f64,
    /// Deltas at or below this many dollars produce no trade.
    pub materiality_usd: f64,
    /// Network that verifies every trade before it runs on the asset's chain.
    pub verification_network: String,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            notional_usd: DEFAULT_NOTIONAL_USD,
            materiality_usd: DEFAULT_MATERIALITY_USD,
            verification_network: DEFAULT_VERIFICATION_NETWORK.to_string(),
        }
    }
}

impl DiffConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.notional_usd.is_finite() || self.notional_usd <= 0.0 {
            return Err(AgentError::ConfigError(format!(
                "notional must be positive, got {}",
                self.notional_usd
            )));
        }
        if !self.materiality_usd.is_finite() || self.materiality_usd < 0.0 {
            return Err(AgentError::ConfigError(format!(
                "materiality threshold must be non-negative, got {}",
                self.materiality_usd
            )));
        }
        Ok(())
    }
}

/// Native chain for a known asset symbol.
pub fn native_chain(asset: &str) -> &'static str {
    match asset {
        "BTC" => "Bitcoin",
        "ETH" => "Ethereum",
        "NEAR" => "NEAR Protocol",
        "SOL" => "Solana",
        _ => "Unknown",
    }
}

/// Flat per-chain fee estimate in USD.
pub fn estimated_fee(chain: &str) -> f64 {
    match chain {
        "Bitcoin" => 0.45,
        "Ethereum" => 0.35,
        "NEAR Protocol" => 0.10,
        "Solana" => 0.12,
        _ => 0.60,
    }
}

/// Emission order for the assets every default policy trades.
const ENUMERATION_ORDER: [&str; 4] = ["BTC", "ETH", "NEAR", "SOL"];

fn emission_rank(asset: &str) -> usize {
    ENUMERATION_ORDER
        .iter()
        .position(|known| *known == asset)
        .unwrap_or(ENUMERATION_ORDER.len())
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Trades moving `current` to `target` on a portfolio worth `notional` dollars.
///
/// BTC, ETH, NEAR and SOL come first in that order, then any other target
/// asset in the target's order, then assets held in `current` but absent from
/// `target` (sold down to zero). An asset missing from `current` counts as a
/// zero weight. A negative `materiality_usd` is treated as zero.
pub fn diff(
    current: &Allocation,
    target: &Allocation,
    notional: f64,
    materiality_usd: f64,
    verification_network: &str,
) -> Vec<Transaction> {
    let materiality_usd = materiality_usd.max(0.0);

    let dropped = current
        .iter()
        .filter(|(asset, _)| target.weight(asset).is_none())
        .map(|(asset, _)| (asset, 0.0));

    let mut legs: Vec<(&str, f64)> = target.iter().chain(dropped).collect();
    legs.sort_by_key(|(asset, _)| emission_rank(asset));

    legs.into_iter()
        .filter_map(|(asset, target_weight)| {
            let current_weight = current.weight(asset).unwrap_or(0.0);
            let delta = target_weight * notional - current_weight * notional;
            let amount_usd = round_cents(delta.abs());

            if amount_usd <= materiality_usd {
                return None;
            }

            let chain = native_chain(asset);
            Some(Transaction {
                side: if delta > 0.0 { TradeSide::Buy } else { TradeSide::Sell },
                asset: asset.to_string(),
                amount_usd,
                chain: chain.to_string(),
                estimated_fee: estimated_fee(chain),
                verification_path: format!(
                    "Verified by {} → executed on {}",
                    verification_network, chain
                ),
            })
        })
        .collect()
}

/// `diff` bound to a validated configuration.
#[derive(Debug, Clone, Default)]
pub struct TransactionDiffer {
    config: DiffConfig,
}

impl TransactionDiffer {
    pub fn new(config: DiffConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    pub fn diff(&self, current: &Allocation, target: &Allocation) -> Vec<Transaction> {
        diff(
            current,
            target,
            self.config.notional_usd,
            self.config.materiality_usd,
            &self.config.verification_network,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> Allocation {
        Allocation::equal_weight(&["BTC", "ETH", "NEAR", "SOL"]).unwrap()
    }

    fn bullish_target() -> Allocation {
        Allocation::new(vec![
            ("BTC", 0.25 - 0.10),
            ("ETH", 0.25 + 0.10),
            ("NEAR", 0.25 + 0.05),
            ("SOL", 0.25 - 0.05),
        ])
        .unwrap()
    }

    #[test]
    fn test_bullish_rebalance() {
        let txs = TransactionDiffer::default().diff(&baseline(), &bullish_target());

        let summary: Vec<(TradeSide, &str, f64)> = txs
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
        assert_eq!(txs[0].chain, "Bitcoin");
        assert_eq!(txs[2].chain, "NEAR Protocol");
        assert_eq!(txs[3].verification_path, "Verified by NEAR → executed on Solana");
        assert_eq!(txs[1].estimated_fee, estimated_fee("Ethereum"));
    }

    #[test]
    fn test_identical_allocations_produce_no_trades() {
        let allocations = [baseline(), bullish_target()];
        for allocation in &allocations {
            for notional in [1.0, 100_000.0, 1e12] {
                for threshold in [0.0, 100.0, 1e6] {
                    assert!(diff(allocation, allocation, notional, threshold, "NEAR").is_empty());
                }
            }
        }
    }

    #[test]
    fn test_no_trade_at_or_below_materiality() {
        let target = Allocation::new(vec![
            ("BTC", 0.251),
            ("ETH", 0.249),
            ("NEAR", 0.2495),
            ("SOL", 0.2505),
        ])
        .unwrap();

        // deltas: +100, -100, -50, +50
        assert!(diff(&baseline(), &target, 100_000.0, 100.0, "NEAR").is_empty());

        let txs = diff(&baseline(), &target, 100_000.0, 60.0, "NEAR");
        assert_eq!(txs.len(), 2);
        for threshold in [0.0, 10.0, 60.0, 99.99] {
            for tx in diff(&baseline(), &target, 100_000.0, threshold, "NEAR") {
                assert!(tx.amount_usd > threshold);
            }
        }
    }

    #[test]
    fn test_amounts_are_rounded_to_cents() {
        let target = Allocation::new(vec![("BTC", 0.3333333), ("ETH", 0.6666667)]).unwrap();
        let current = Allocation::new(vec![("BTC", 0.5), ("ETH", 0.5)]).unwrap();

        let txs = diff(&current, &target, 1000.0, 1.0, "NEAR");
        assert_eq!(txs[0].side, TradeSide::Sell);
        assert_eq!(txs[0].amount_usd, 166.67);
        assert_eq!(txs[1].side, TradeSide::Buy);
        assert_eq!(txs[1].amount_usd, 166.67);
    }

    #[test]
    fn test_dropped_and_unknown_assets() {
        let current = Allocation::new(vec![("BTC", 0.5), ("DOGE", 0.5)]).unwrap();
        let target = Allocation::new(vec![("BTC", 0.5), ("ETH", 0.5)]).unwrap();

        let txs = diff(&current, &target, 10_000.0, 100.0, "NEAR");
        assert_eq!(txs.len(), 2);
        assert_eq!((txs[0].side, txs[0].asset.as_str()), (TradeSide::Buy, "ETH"));
        assert_eq!((txs[1].side, txs[1].asset.as_str()), (TradeSide::Sell, "DOGE"));
        assert_eq!(txs[1].chain, "Unknown");
        assert_eq!(txs[1].amount_usd, 5000.0);
    }

    #[test]
    fn test_emission_order_is_fixed() {
        let current = Allocation::new(vec![
            ("DOGE", 0.2),
            ("SOL", 0.2),
            ("NEAR", 0.2),
            ("ETH", 0.2),
            ("BTC", 0.2),
        ])
        .unwrap();
        let target = Allocation::new(vec![
            ("AVAX", 0.1),
            ("SOL", 0.3),
            ("BTC", 0.3),
            ("NEAR", 0.1),
            ("ETH", 0.2),
        ])
        .unwrap();

        let assets: Vec<String> = diff(&current, &target, 10_000.0, 1.0, "NEAR")
            .into_iter()
            .map(|t| t.asset)
            .collect();
        assert_eq!(assets, vec!["BTC", "NEAR", "SOL", "AVAX", "DOGE"]);
    }

    #[test]
    fn test_negative_materiality_is_treated_as_zero() {
        let allocation = baseline();
        assert!(diff(&allocation, &allocation, 100_000.0, -5.0, "NEAR").is_empty());

        let txs = diff(&allocation, &bullish_target(), 100_000.0, -5.0, "NEAR");
        assert_eq!(txs.len(), 4);
        assert!(txs.iter().all(|t| t.amount_usd > 0.0));
    }

    #[test]
    fn test_config_validation() {
        let mut config = DiffConfig::default();
        assert!(TransactionDiffer::new(config.clone()).is_ok());

        config.notional_usd = 0.0;
        assert!(TransactionDiffer::new(config.clone()).is_err());

        config.notional_usd = 50_000.0;
        config.materiality_usd = -1.0;
        assert!(TransactionDiffer::new(config).is_err());
    }

    #[test]
    fn test_custom_verification_network() {
        let differ = TransactionDiffer::new(DiffConfig {
            notional_usd: 1_000_000.0,
            materiality_usd: 1_000.0,
            verification_network: "Aurora".to_string(),
        })
        .unwrap();

        let txs = differ.diff(&baseline(), &bullish_target());
        assert_eq!(txs[0].amount_usd, 100_000.0);
        assert!(txs[0].verification_path.starts_with("Verified by Aurora"));
    }
}
