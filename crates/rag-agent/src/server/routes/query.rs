//! Query endpoints: translate HTTP requests into inbound events

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::handler::ResponseEnvelope;
use crate::server::state::AppState;

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            self.body,
        )
            .into_response()
    }
}

/// GET /query?question=...
pub async fn query_get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ResponseEnvelope {
    let event = json!({
        "httpMethod": "GET",
        "path": "/query",
        "queryStringParameters": params,
    });

    state.handler().handle(&event).await
}

/// POST /query with a JSON (or plain-text) body
pub async fn query_post(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> ResponseEnvelope {
    let headers: Map<String, Value> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.to_string(), Value::String(v.to_string())))
        })
        .collect();

    let mut event = json!({
        "httpMethod": "POST",
        "path": "/query",
        "body": body,
        "headers": headers,
    });
    if !params.is_empty() {
        event["queryStringParameters"] = json!(params);
    }

    state.handler().handle(&event).await
}
