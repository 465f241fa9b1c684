//! Candidate validation
//!
//! Turns one candidate substring into a typed `Verdict` or a typed rejection.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{Confidence, Provenance, Sentiment, Verdict};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no candidate object found")]
    NoCandidate,

    #[error("candidate is not valid JSON: {0}")]
    Malformed(String),

    #[error("candidate is not a JSON object")]
    NotAnObject,

    #[error("missing sentiment")]
    MissingSentiment,

    #[error("unsupported sentiment '{0}'")]
    UnknownSentiment(String),

    #[error("missing numeric confidence")]
    MissingConfidence,
}

/// Parse and validate a single candidate.
pub fn validate_candidate(candidate: &str) -> Result<Verdict, Rejection> {
    let value: Value =
        serde_json::from_str(candidate).map_err(|e| Rejection::Malformed(e.to_string()))?;

    let object = value.as_object().ok_or(Rejection::NotAnObject)?;

    let raw_sentiment = object
        .get("sentiment")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(Rejection::MissingSentiment)?;

    let sentiment = Sentiment::parse(raw_sentiment)
        .ok_or_else(|| Rejection::UnknownSentiment(raw_sentiment.to_string()))?;

    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .and_then(Confidence::new)
        .ok_or(Rejection::MissingConfidence)?;

    let score = object
        .get("score")
        .and_then(Value::as_f64)
        .map(|s| s.round() as i64)
        .unwrap_or(0);

    Ok(Verdict::new(sentiment, confidence, Provenance::LanguageModel)
        .with_score(score)
        .with_reasoning(text_field(object, "reasoning"))
        .with_risks(text_field(object, "risks")))
}

/// Free-text fields are usually strings; models sometimes emit a list instead.
fn text_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_candidate() {
        let verdict = validate_candidate(
            r#"{"sentiment":"Bearish","confidence":0.35,"score":-4,"reasoning":"r","risks":"k"}"#,
        )
        .unwrap();
        assert_eq!(verdict.sentiment(), Sentiment::Bearish);
        assert_eq!(verdict.confidence().value(), 0.35);
        assert_eq!(verdict.score(), -4);
        assert_eq!(verdict.provenance(), Provenance::LanguageModel);
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let verdict = validate_candidate(r#"{"sentiment":"neutral","confidence":0}"#).unwrap();
        assert_eq!(verdict.score(), 0);
        assert_eq!(verdict.reasoning(), "");
        assert_eq!(verdict.risks(), "");
        assert_eq!(verdict.confidence(), Confidence::ZERO);
    }

    #[test]
    fn test_confidence_is_clamped_not_rejected() {
        let verdict = validate_candidate(r#"{"sentiment":"bullish","confidence":85}"#).unwrap();
        assert_eq!(verdict.confidence().value(), 1.0);
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            validate_candidate("{\"sentiment\": "),
            Err(Rejection::Malformed(_))
        ));
        assert_eq!(validate_candidate("[1,2]"), Err(Rejection::NotAnObject));
        assert_eq!(
            validate_candidate(r#"{"confidence":0.5}"#),
            Err(Rejection::MissingSentiment)
        );
        assert_eq!(
            validate_candidate(r#"{"sentiment":"  ","confidence":0.5}"#),
            Err(Rejection::MissingSentiment)
        );
        assert_eq!(
            validate_candidate(r#"{"sentiment":"mixed","confidence":0.5}"#),
            Err(Rejection::UnknownSentiment("mixed".to_string()))
        );
        assert_eq!(
            validate_candidate(r#"{"sentiment":"bullish","confidence":"high"}"#),
            Err(Rejection::MissingConfidence)
        );
    }

    #[test]
    fn test_list_risks_are_joined() {
        let verdict = validate_candidate(
            r#"{"sentiment":"bearish","confidence":0.6,"risks":["regulation","liquidity"]}"#,
        )
        .unwrap();
        assert_eq!(verdict.risks(), "regulation; liquidity");
    }
}
