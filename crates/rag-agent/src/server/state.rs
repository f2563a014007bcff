//! Application state for the HTTP server

use std::sync::Arc;

use crate::handler::AgentHandler;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    handler: Arc<AgentHandler>,
}

impl AppState {
    pub fn new(handler: Arc<AgentHandler>) -> Self {
        Self { handler }
    }

    /// The request handler every route delegates to
    pub fn handler(&self) -> &AgentHandler {
        &self.handler
    }

    /// Ready once the retrieval pipeline has been constructed
    pub fn is_ready(&self) -> bool {
        self.handler.is_ready()
    }
}
