use axum::{
    routing::{any_service, get},
    Router,
};
use std::sync::Arc;

use crate::core::orchestrator::Orchestrator;
use crate::infra::runtime::mcp_transport::{make_streamable_http_service, LocalSessionManager};
use crate::tools::gemini::GeminiSvc;

/// `/healthz` + streamable MCP at `/mcp`. Every session shares `orchestrator`,
/// so the rate limit and consultation log are process-wide.
pub fn build_app(orchestrator: Arc<Orchestrator>) -> Router {
    let session_mgr = Arc::new(LocalSessionManager::default());
    let factory = move || (GeminiSvc::new(orchestrator.clone()), GeminiSvc::router());
    let mcp_service = make_streamable_http_service(factory, session_mgr);

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route_service("/mcp", any_service(mcp_service))
}
