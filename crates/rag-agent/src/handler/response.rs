//! Uniform `{statusCode, body}` response envelope

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Error;
use crate::types::QueryResult;

/// Response envelope; `body` is always a JSON document encoded as a string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl ResponseEnvelope {
    fn json(status_code: u16, body: Value) -> Self {
        Self {
            status_code,
            body: body.to_string(),
        }
    }

    /// 200 with the answer and its sources
    pub fn ok(result: &QueryResult) -> Self {
        match serde_json::to_string(result) {
            Ok(body) => Self {
                status_code: 200,
                body,
            },
            Err(e) => Self::from_error(&Error::Json(e)),
        }
    }

    /// 400 for a request without a usable question
    pub fn bad_request(error: &Error) -> Self {
        let message = Error::NoQuestion.to_string();
        match error {
            Error::NoQuestion => Self::json(400, json!({ "error": message })),
            other => Self::json(400, json!({ "error": message, "details": detail(other) })),
        }
    }

    /// 500 when the orchestrator cannot be constructed
    pub fn index_unavailable(error: &Error) -> Self {
        Self::json(
            500,
            json!({ "error": "index unavailable", "details": detail(error) }),
        )
    }

    /// Per-request failure, mapped through the error taxonomy
    pub fn from_error(error: &Error) -> Self {
        Self::json(
            error.status_code(),
            json!({ "error": error.tag(), "details": detail(error) }),
        )
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Decode the body, mainly for callers that render it
    pub fn body_json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

/// Human-readable message; provider payloads stay in the logs
fn detail(error: &Error) -> String {
    match error {
        Error::Http(_) => "upstream request failed".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, SourceMetadata};
    use std::path::Path;

    #[test]
    fn test_ok_body_shape() {
        let chunk = Chunk::new("x".repeat(500), SourceMetadata::new("policy.txt"), 0);
        let envelope = ResponseEnvelope::ok(&QueryResult::new("30 days".to_string(), [&chunk]));

        assert_eq!(envelope.status_code, 200);
        let body = envelope.body_json().unwrap();
        assert_eq!(body["answer"], "30 days");
        assert_eq!(body["sources"][0]["source"], "policy.txt");
        assert_eq!(body["sources"][0]["preview"].as_str().unwrap().len(), 240);
    }

    #[test]
    fn test_bad_request() {
        let envelope = ResponseEnvelope::bad_request(&Error::NoQuestion);
        assert_eq!(envelope.status_code, 400);
        assert_eq!(envelope.body, r#"{"error":"no question supplied"}"#);

        let envelope =
            ResponseEnvelope::bad_request(&Error::ClientInput("body is not JSON".to_string()));
        assert_eq!(envelope.body_json().unwrap()["details"], "Invalid request: body is not JSON");
    }

    #[test]
    fn test_index_unavailable() {
        let err = Error::not_found("Vector index directory", Path::new("/srv/index"));
        let envelope = ResponseEnvelope::index_unavailable(&err);
        assert_eq!(envelope.status_code, 500);

        let body = envelope.body_json().unwrap();
        assert_eq!(body["error"], "index unavailable");
        assert!(body["details"].as_str().unwrap().contains("/srv/index"));
    }

    #[test]
    fn test_from_error_uses_taxonomy() {
        let envelope = ResponseEnvelope::from_error(&Error::llm("quota exceeded"));
        assert_eq!(envelope.status_code, 502);
        assert_eq!(envelope.body_json().unwrap()["error"], "generation_error");
        assert!(!envelope.is_success());
    }

    #[test]
    fn test_envelope_serializes_status_code_camel_case() {
        let envelope = ResponseEnvelope::from_error(&Error::internal("boom"));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["statusCode"], 500);
        assert!(value["body"].is_string());
    }
}
