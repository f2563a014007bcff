//! Question extraction from heterogeneous inbound events
//!
//! An event is a JSON object in one of three shapes: `{question}`, a
//! gateway-style `{body, headers, httpMethod, path, queryStringParameters}`,
//! or just `{queryStringParameters}`. Extraction runs a fixed list of
//! strategies in order and stops at the first one that yields a question.
//! A strategy that rejects its input does not stop the search; its error is
//! reported only when no later strategy finds a question.

use serde_json::Value;

use crate::error::{Error, Result};

/// How a `body` string that is not JSON is treated
///
/// Bodies that start like a JSON object or array but fail to parse are
/// malformed requests in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyMode {
    /// Use a plain-text body as the question
    #[default]
    Permissive,
    /// Reject any body that is not JSON
    Strict,
}

impl BodyMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            BodyMode::Strict
        } else {
            BodyMode::Permissive
        }
    }
}

type Strategy = fn(&Value, BodyMode) -> Result<Option<String>>;

/// Extraction strategies in precedence order
const STRATEGIES: [(&str, Strategy); 3] = [
    ("direct", direct_field),
    ("body", body_field),
    ("query_string", query_string),
];

/// Extract the question from an event
pub fn extract_question(event: &Value, mode: BodyMode) -> Result<String> {
    let mut rejected = None;

    for (name, strategy) in STRATEGIES {
        match strategy(event, mode) {
            Ok(Some(question)) => {
                tracing::debug!("Question extracted via {} strategy", name);
                return Ok(question);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!("{} strategy rejected the event: {}", name, e);
                rejected.get_or_insert(e);
            }
        }
    }

    Err(rejected.unwrap_or(Error::NoQuestion))
}

/// Non-blank string value, trimmed
fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `question`, then `query`, from an object
fn question_or_query(object: &Value) -> Option<String> {
    text(object.get("question")).or_else(|| text(object.get("query")))
}

fn direct_field(event: &Value, _mode: BodyMode) -> Result<Option<String>> {
    Ok(text(event.get("question")))
}

fn body_field(event: &Value, mode: BodyMode) -> Result<Option<String>> {
    match event.get("body") {
        Some(Value::String(raw)) => {
            if raw.trim().is_empty() {
                return Ok(None);
            }
            match serde_json::from_str::<Value>(raw) {
                Ok(parsed @ Value::Object(_)) => Ok(question_or_query(&parsed)),
                // A JSON string literal is the question itself
                Ok(Value::String(s)) => Ok(Some(s.trim().to_string()).filter(|s| !s.is_empty())),
                Ok(_) => Ok(None),
                Err(e) => {
                    let trimmed = raw.trim();
                    let looks_like_json = trimmed.starts_with('{') || trimmed.starts_with('[');
                    if mode == BodyMode::Permissive && !looks_like_json {
                        return Ok(Some(trimmed.to_string()));
                    }
                    Err(Error::ClientInput(format!(
                        "request body is not valid JSON: {}",
                        e
                    )))
                }
            }
        }
        Some(body @ Value::Object(_)) => Ok(question_or_query(body)),
        _ => Ok(None),
    }
}

fn query_string(event: &Value, _mode: BodyMode) -> Result<Option<String>> {
    Ok(event
        .get("queryStringParameters")
        .filter(|params| params.is_object())
        .and_then(question_or_query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(event: Value) -> Result<String> {
        extract_question(&event, BodyMode::Permissive)
    }

    #[test]
    fn test_direct_field_wins_over_body() {
        let event = json!({"question": "A", "body": "{\"question\":\"B\"}"});
        assert_eq!(extract(event).unwrap(), "A");
    }

    #[test]
    fn test_body_wins_over_query_string() {
        let event = json!({
            "body": "{\"query\":\"from body\"}",
            "queryStringParameters": {"question": "from query string"}
        });
        assert_eq!(extract(event).unwrap(), "from body");
    }

    #[test]
    fn test_body_question_before_query() {
        let event = json!({"body": {"query": "second", "question": "first"}});
        assert_eq!(extract(event).unwrap(), "first");
    }

    #[test]
    fn test_query_string_question_then_query() {
        let event = json!({"queryStringParameters": {"query": "q"}});
        assert_eq!(extract(event).unwrap(), "q");

        let event = json!({"queryStringParameters": {"query": "q", "question": "Q"}});
        assert_eq!(extract(event).unwrap(), "Q");
    }

    #[test]
    fn test_falls_through_body_without_question() {
        let event = json!({
            "body": "{\"foo\": 1}",
            "queryStringParameters": {"question": "from query string"}
        });
        assert_eq!(extract(event).unwrap(), "from query string");
    }

    #[test]
    fn test_blank_values_do_not_match() {
        let event = json!({"question": "   ", "body": "", "queryStringParameters": {"question": ""}});
        assert!(matches!(extract(event), Err(Error::NoQuestion)));
    }

    #[test]
    fn test_non_json_body_depends_on_mode() {
        let event = json!({"body": "How many vacation days?"});
        assert_eq!(
            extract_question(&event, BodyMode::Permissive).unwrap(),
            "How many vacation days?"
        );
        assert!(matches!(
            extract_question(&event, BodyMode::Strict),
            Err(Error::ClientInput(_))
        ));
    }

    #[test]
    fn test_malformed_json_body_is_rejected() {
        let event = json!({"body": "{\"questio\": "});
        assert!(matches!(extract(event), Err(Error::ClientInput(_))));
    }

    #[test]
    fn test_malformed_body_falls_through_to_query_string() {
        let event = json!({
            "body": "{\"questio\": ",
            "queryStringParameters": {"question": "from query string"}
        });
        assert_eq!(
            extract_question(&event, BodyMode::Permissive).unwrap(),
            "from query string"
        );
        assert_eq!(
            extract_question(&event, BodyMode::Strict).unwrap(),
            "from query string"
        );
    }

    #[test]
    fn test_strict_plain_body_falls_through_to_query_string() {
        let event = json!({
            "body": "what is the policy?",
            "queryStringParameters": {"query": "from query string"}
        });
        assert_eq!(
            extract_question(&event, BodyMode::Strict).unwrap(),
            "from query string"
        );
    }

    #[test]
    fn test_malformed_body_error_wins_over_missing_question() {
        let event = json!({"body": "[1, 2", "queryStringParameters": {"other": "x"}});
        let err = extract(event).unwrap_err();
        assert!(matches!(&err, Error::ClientInput(m) if m.starts_with("request body is not valid JSON")));
    }

    #[test]
    fn test_json_string_body_is_the_question() {
        let event = json!({"body": "\"What is the parental leave?\""});
        assert_eq!(
            extract_question(&event, BodyMode::Strict).unwrap(),
            "What is the parental leave?"
        );
    }

    #[test]
    fn test_empty_event() {
        assert!(matches!(extract(json!({})), Err(Error::NoQuestion)));
        assert!(matches!(extract(json!({"question": 42})), Err(Error::NoQuestion)));
    }
}
