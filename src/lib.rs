//! Sentiment Rebalancer
//!
//! Turns free-form market commentary into a portfolio rebalancing plan:
//! - Asks a hosted language model for a sentiment verdict
//! - Recovers the verdict from noisy, wrapped or truncated completion text
//! - Falls back to a deterministic keyword scorer so the pipeline never dead-ends
//! - Maps the verdict to target weights and the trades needed to reach them
//!
//! PIPELINE:
//! NEWS → COMPLETE → EXTRACT | FALLBACK → PLAN → DIFF → RECORD

pub mod agent;
pub mod api;
pub mod audit;
pub mod config;
pub mod differ;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod models;
pub mod policy;
pub mod scorer;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use extractor::{extract, ExtractionFailure};
pub use scorer::FallbackScorer;
pub use policy::{AllocationPolicy, PolicyConfig};
pub use differ::{diff, TransactionDiffer};
