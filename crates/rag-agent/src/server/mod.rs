//! HTTP server for the RAG agent

pub mod routes;
pub mod state;

use axum::{http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::handler::AgentHandler;
use state::AppState;

/// RAG HTTP Server
pub struct RagServer {
    config: ServerConfig,
    state: AppState,
}

impl RagServer {
    /// Create a server around an existing handler
    pub fn new(handler: Arc<AgentHandler>) -> Self {
        let config = handler.config().server.clone();
        Self {
            config,
            state: AppState::new(handler),
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .merge(routes::agent_routes())
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router.layer(cors)
        } else {
            router
        }
    }

    /// Start the server and run until Ctrl+C
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.router();

        tracing::info!("Starting RAG agent on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Readiness: the index is loaded and both providers pass their health checks
async fn readiness(
    state: axum::extract::State<AppState>,
) -> (StatusCode, axum::Json<serde_json::Value>) {
    let ready = state.is_ready();
    let providers = state.handler().providers().health().await;

    let status = if ready && providers.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        axum::Json(serde_json::json!({ "index_loaded": ready, "providers": providers })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RagConfig;
    use crate::ingestion::IndexBuilder;
    use crate::providers::Providers;
    use crate::testing::{FailingEmbedder, HashEmbedder, RecordingLlm};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn server_with_index(dir: &std::path::Path) -> RagServer {
        std::fs::create_dir_all(dir.join("data")).unwrap();
        std::fs::write(
            dir.join("data/vacation.txt"),
            "Paid vacation is 30 days per year.",
        )
        .unwrap();

        let mut config = RagConfig::default();
        config.paths.data_path = dir.join("data");
        config.paths.index_path = dir.join("index");

        let embedder = Arc::new(HashEmbedder::default());
        IndexBuilder::from_config(&config)
            .unwrap()
            .build_and_persist(embedder.as_ref())
            .await
            .unwrap();

        let providers = Providers::new(embedder, Arc::new(RecordingLlm::new("30 days")));
        RagServer::new(Arc::new(AgentHandler::new(config, providers)))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_post_query() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with_index(dir.path()).await;

        let request = Request::post("/query")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"question":"How many vacation days?"}"#))
            .unwrap();
        let (status, body) = send(server.router(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "30 days");
        assert_eq!(body["sources"][0]["source"], "vacation.txt");
    }

    #[tokio::test]
    async fn test_get_query_and_missing_question() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with_index(dir.path()).await;

        let request = Request::get("/query?query=vacation").body(Body::empty()).unwrap();
        let (status, _) = send(server.router(), request).await;
        assert_eq!(status, StatusCode::OK);

        let request = Request::get("/query").body(Body::empty()).unwrap();
        let (status, body) = send(server.router(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "no question supplied");
    }

    #[tokio::test]
    async fn test_readiness_follows_warmup() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with_index(dir.path()).await;

        let request = Request::get("/ready").body(Body::empty()).unwrap();
        let (status, body) = send(server.router(), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["index_loaded"], false);

        server.state.handler().warmup().await.unwrap();

        let request = Request::get("/ready").body(Body::empty()).unwrap();
        let (status, body) = send(server.router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["providers"]["embedding"]["healthy"], true);
        assert_eq!(body["providers"]["generation"]["provider"], "recording");

        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(server.router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unhealthy_provider_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let built = server_with_index(dir.path()).await;
        built.state.handler().warmup().await.unwrap();

        let config = built.state.handler().config().clone();
        let providers = Providers::new(Arc::new(FailingEmbedder), Arc::new(RecordingLlm::new("x")));
        let server = RagServer::new(Arc::new(AgentHandler::new(config, providers)));
        server.state.handler().warmup().await.unwrap();

        let request = Request::get("/ready").body(Body::empty()).unwrap();
        let (status, body) = send(server.router(), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["index_loaded"], true);
        assert_eq!(body["providers"]["embedding"]["healthy"], false);
    }
}
