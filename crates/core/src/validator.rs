//! Turns one raw sampling response into a typed estimate, or rejects it.

use serde_json::{Map, Value};

use crate::types::{ValidatedEstimate, Verdict};

pub const TIME_FIELD: &str = "approx_t_s";
pub const WINDOW_FIELD: &str = "window_s";
pub const VERDICT_FIELD: &str = "fault";

/// Why a response was dropped. A rejection is a normal outcome.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("empty response")]
    Empty,

    #[error("no JSON object in response")]
    NoStructuredObject,

    #[error("'approx_t_s' is missing or not a non-negative number")]
    InvalidTime,

    #[error("'window_s' is not a [start, end] pair of numbers with start <= end")]
    InvalidWindow,

    #[error("'fault' is not victim, offender or witness (got {0})")]
    UnknownVerdict(String),
}

pub fn validate(raw: &str) -> Result<ValidatedEstimate, Rejection> {
    if raw.trim().is_empty() {
        return Err(Rejection::Empty);
    }
    let object = extract_json_object(raw).ok_or(Rejection::NoStructuredObject)?;

    let time = object
        .get(TIME_FIELD)
        .and_then(Value::as_f64)
        .filter(|t| t.is_finite() && *t >= 0.0)
        .ok_or(Rejection::InvalidTime)?;

    let window = object
        .get(WINDOW_FIELD)
        .and_then(parse_window)
        .ok_or(Rejection::InvalidWindow)?;

    let verdict = match object.get(VERDICT_FIELD) {
        Some(Value::String(label)) => {
            Verdict::from_label(label).ok_or_else(|| Rejection::UnknownVerdict(label.clone()))?
        }
        Some(other) => return Err(Rejection::UnknownVerdict(other.to_string())),
        None => return Err(Rejection::UnknownVerdict("nothing".to_string())),
    };

    Ok(ValidatedEstimate {
        time,
        window,
        verdict,
    })
}

fn parse_window(value: &Value) -> Option<(f64, f64)> {
    let [start, end] = value.as_array()?.as_slice() else {
        return None;
    };
    let (start, end) = (start.as_f64()?, end.as_f64()?);
    (start.is_finite() && end.is_finite() && start <= end).then_some((start, end))
}

/// Find the first well-formed JSON object embedded in free text.
///
/// Scans each `{` in order and parses a single value from there, ignoring
/// whatever follows it, so code fences and chatter around the object are fine.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(object))) => Some(object),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_object() {
        let estimate =
            validate(r#"{"approx_t_s": 5.2, "window_s": [4.0, 7.0], "fault": "victim"}"#).unwrap();
        assert_eq!(estimate.time, 5.2);
        assert_eq!(estimate.window, (4.0, 7.0));
        assert_eq!(estimate.verdict, Verdict::Victim);
    }

    #[test]
    fn finds_object_inside_markdown_and_prose() {
        let raw = "Sure! Here is the result:\n```json\n{\"approx_t_s\": 12, \"window_s\": [11, 13.5], \"fault\": \"offender\"}\n```\nLet me know {if} you need more.";
        let estimate = validate(raw).unwrap();
        assert_eq!(estimate.time, 12.0);
        assert_eq!(estimate.verdict, Verdict::Offender);
    }

    #[test]
    fn skips_broken_braces_before_the_object() {
        let raw = r#"{oops} then {"approx_t_s": 1.5, "window_s": [1, 2], "fault": "witness"}"#;
        assert_eq!(validate(raw).unwrap().verdict, Verdict::Witness);
    }

    #[test]
    fn rejects_without_object() {
        assert_eq!(validate("   "), Err(Rejection::Empty));
        assert_eq!(
            validate("the collision happens at 5 seconds"),
            Err(Rejection::NoStructuredObject)
        );
        assert_eq!(validate("[1, 2, 3]"), Err(Rejection::NoStructuredObject));
    }

    #[test]
    fn rejects_non_numeric_time() {
        let raw = r#"{"approx_t_s": "5.2", "window_s": [4, 7], "fault": "victim"}"#;
        assert_eq!(validate(raw), Err(Rejection::InvalidTime));
        let raw = r#"{"approx_t_s": -1, "window_s": [4, 7], "fault": "victim"}"#;
        assert_eq!(validate(raw), Err(Rejection::InvalidTime));
    }

    #[test]
    fn rejects_bad_windows() {
        for window in ["[4]", "[4, 5, 6]", "[\"4\", 5]", "[7, 4]", "4.5", "null"] {
            let raw = format!(
                r#"{{"approx_t_s": 5, "window_s": {window}, "fault": "victim"}}"#
            );
            assert_eq!(validate(&raw), Err(Rejection::InvalidWindow), "{window}");
        }
    }

    #[test]
    fn rejects_unknown_or_missing_verdict() {
        let raw = r#"{"approx_t_s": 5, "window_s": [4, 7], "fault": "bystander"}"#;
        assert_eq!(
            validate(raw),
            Err(Rejection::UnknownVerdict("bystander".into()))
        );
        let raw = r#"{"approx_t_s": 5, "window_s": [4, 7]}"#;
        assert!(matches!(validate(raw), Err(Rejection::UnknownVerdict(_))));
    }
}
