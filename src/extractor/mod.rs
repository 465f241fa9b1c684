//! Verdict extraction from free-form completion text
//!
//! The completion is asked for a bare JSON object but routinely comes back
//! wrapped in prose, markdown, LaTeX, duplicated or cut off. Strategies run in
//! priority order and the first one yielding a valid verdict wins:
//!
//! 1. `balanced_scan` - longest brace-balanced match (one nesting level)
//! 2. `outer_slice`   - first `{` to last `}`
//! 3. `depth_scan`    - every top-level object, in scan order

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::error::AgentError;
use crate::models::Verdict;

pub mod schema;
pub mod strategies;

pub use schema::{validate_candidate, Rejection};

/// A named candidate-finding strategy.
pub struct Strategy {
    pub name: &'static str,
    pub run: fn(&str) -> Result<Verdict, Rejection>,
}

pub const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "balanced_scan",
        run: strategies::balanced_scan,
    },
    Strategy {
        name: "outer_slice",
        run: strategies::outer_slice,
    },
    Strategy {
        name: "depth_scan",
        run: strategies::depth_scan,
    },
];

/// No strategy produced a valid verdict.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("no candidate produced a valid verdict ({})", describe(.rejections))]
pub struct ExtractionFailure {
    pub rejections: Vec<(&'static str, Rejection)>,
}

fn describe(rejections: &[(&'static str, Rejection)]) -> String {
    rejections
        .iter()
        .map(|(name, rejection)| format!("{}: {}", name, rejection))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ExtractionFailure> for AgentError {
    fn from(failure: ExtractionFailure) -> Self {
        AgentError::ExtractionFailure(failure.to_string())
    }
}

/// Recover a verdict from raw completion text.
pub fn extract(text: &str) -> Result<Verdict, ExtractionFailure> {
    let mut rejections = Vec::with_capacity(STRATEGIES.len());

    for strategy in STRATEGIES {
        match (strategy.run)(text) {
            Ok(verdict) => {
                debug!(strategy = strategy.name, "Verdict extracted");
                return Ok(verdict.with_timestamp(Utc::now()));
            }
            Err(rejection) => {
                debug!(strategy = strategy.name, %rejection, "Strategy rejected");
                rejections.push((strategy.name, rejection));
            }
        }
    }

    Err(ExtractionFailure { rejections })
}
