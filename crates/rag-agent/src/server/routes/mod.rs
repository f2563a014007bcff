//! HTTP routes for the agent

pub mod query;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::server::state::AppState;

/// Build the agent routes
pub fn agent_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(info))
        .route("/query", get(query::query_get).post(query::query_post))
}

/// Usage hint at the root path
async fn info() -> Json<Value> {
    Json(json!({
        "name": "rag-agent",
        "version": env!("CARGO_PKG_VERSION"),
        "message": "Use POST /query with JSON {\"question\": \"...\"} or GET /query?question=...",
        "endpoints": {
            "health": "/health",
            "ready": "/ready",
            "query": "/query"
        }
    }))
}
