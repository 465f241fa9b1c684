//! Candidate-finding strategies
//!
//! Each strategy is an independent pure function over the full completion
//! text. All scans are linear in the input length.

use lazy_static::lazy_static;
use regex::Regex;

use super::schema::{validate_candidate, Rejection};
use crate::models::Verdict;

lazy_static! {
    /// Brace-balanced object tolerating one level of nesting.
    static ref BALANCED_OBJECT: Regex =
        Regex::new(r"\{(?:[^{}]|\{[^{}]*\})*\}").expect("balanced object pattern is valid");
}

/// Longest balanced-brace match; on equal length the later match wins.
pub fn balanced_scan(text: &str) -> Result<Verdict, Rejection> {
    let candidate = BALANCED_OBJECT
        .find_iter(text)
        .max_by_key(|m| m.as_str().len())
        .ok_or(Rejection::NoCandidate)?;

    validate_candidate(candidate.as_str())
}

/// Everything from the first `{` to the last `}`.
pub fn outer_slice(text: &str) -> Result<Verdict, Rejection> {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => validate_candidate(&text[start..=end]),
        _ => Err(Rejection::NoCandidate),
    }
}

/// Top-level `{...}` spans in scan order; the first that validates wins.
pub fn depth_scan(text: &str) -> Result<Verdict, Rejection> {
    let mut last = Rejection::NoCandidate;

    for candidate in top_level_objects(text) {
        match validate_candidate(candidate) {
            Ok(verdict) => return Ok(verdict),
            Err(rejection) => last = rejection,
        }
    }

    Err(last)
}

/// Spans opening at depth 0 and closing back at depth 0.
/// Stray closing braces at depth 0 are ignored.
pub fn top_level_objects(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;

    for (i, byte) in text.bytes().enumerate() {
        match byte {
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    candidates.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    candidates
}
