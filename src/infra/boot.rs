use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use crate::core::orchestrator::Orchestrator;
use crate::infra::config::{Config, GeminiConfig};
use crate::tools::gemini::GeminiSvc;

/// Loads configuration and builds the shared orchestrator.
pub fn build_orchestrator(project_root: &Path) -> anyhow::Result<Arc<Orchestrator>> {
    let gemini = GeminiConfig::load(project_root);
    gemini.validate()?;
    Ok(Arc::new(Orchestrator::new(gemini)))
}

pub async fn run_server(project_root: &Path) -> anyhow::Result<()> {
    let cfg = Config::from_env();
    cfg.validate()?;
    tracing::info!(
        mode = %cfg.mode,
        port = cfg.port,
        project_root = %project_root.display(),
        "BOOT gemini-mcp-gateway"
    );

    let orchestrator = build_orchestrator(project_root)?;

    if cfg.mode == "stdio" {
        let factory = move || (GeminiSvc::new(orchestrator), GeminiSvc::router());
        crate::infra::runtime::mcp_transport::serve_stdio(factory)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    let app = crate::infra::http_app::build_app(orchestrator);
    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    tracing::info!(%addr, "listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
