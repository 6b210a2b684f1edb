use std::future::Future;
use std::sync::Arc;

use rmcp::handler::server::tool::{Parameters, ToolRouter};
use rmcp::model::{CallToolResult, Content, JsonObject, ServerCapabilities, ServerInfo};
use rmcp::ErrorData as McpError;

use crate::core::orchestrator::Orchestrator;
use crate::domain::patterns::detect_triggers;
use crate::domain::ConsultRequest;
use crate::infra::runtime::mcp_transport::ServerHandler;

use super::format;

#[derive(Clone)]
pub struct GeminiSvc {
    pub orchestrator: Arc<Orchestrator>,
}

impl GeminiSvc {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

impl ServerHandler for GeminiSvc {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Consult Gemini CLI for a second opinion on technical questions.".into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn required_str(params: &JsonObject, key: &str) -> Result<String, McpError> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Err(McpError::invalid_params(
            format!("missing required field: {key}"),
            None,
        )),
        Some(v) => v
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| McpError::invalid_params(format!("{key} must be a string"), None)),
    }
}

fn optional_bool(params: &JsonObject, key: &str) -> Result<Option<bool>, McpError> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| McpError::invalid_params(format!("{key} must be a boolean"), None)),
    }
}

fn markdown(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

#[rmcp::tool_router]
impl GeminiSvc {
    #[rmcp::tool(
        name = "consult_gemini",
        description = "Consult Gemini CLI for a second opinion or validation"
    )]
    async fn consult_gemini(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let args = params.0;
        let query = required_str(&args, "query")?;
        if query.trim().is_empty() {
            return Err(McpError::invalid_params("query must not be empty", None));
        }
        let context = args
            .get("context")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let comparison_mode = optional_bool(&args, "comparison_mode")?.unwrap_or(true);
        let force = optional_bool(&args, "force")?.unwrap_or(false);

        let req = ConsultRequest::new(query)
            .with_context(context)
            .comparison_mode(comparison_mode)
            .force(force);
        let result = self.orchestrator.consult(req).await;
        let mut out = markdown(format::consultation(&self.orchestrator, &result));
        out.structured_content = serde_json::to_value(&result).ok();
        Ok(out)
    }

    #[rmcp::tool(
        name = "gemini_status",
        description = "Get Gemini integration status and statistics"
    )]
    async fn gemini_status(&self) -> Result<CallToolResult, McpError> {
        Ok(markdown(format::status(&self.orchestrator.status())))
    }

    #[rmcp::tool(
        name = "toggle_gemini_auto_consult",
        description = "Toggle automatic Gemini consultation on uncertainty detection"
    )]
    async fn toggle_gemini_auto_consult(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let enable = optional_bool(&params.0, "enable")?;
        let now = self.orchestrator.set_auto_consult(enable);
        Ok(markdown(format::toggle(now)))
    }

    #[rmcp::tool(
        name = "detect_uncertainty",
        description = "Scan text for uncertainty, complex-decision and critical-operation triggers; returns {\"triggered\": bool, \"matches\": [...], \"auto_consult\": bool}"
    )]
    async fn detect_uncertainty(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<serde_json::Value>, McpError> {
        let text = required_str(&params.0, "text")?;
        let report = detect_triggers(&text);
        let matches: Vec<serde_json::Value> = report
            .matches
            .iter()
            .map(|m| serde_json::json!({"category": m.category, "pattern": m.pattern}))
            .collect();
        Ok(rmcp::Json(serde_json::json!({
            "triggered": report.triggered,
            "matches": matches,
            "summary": format::triggers(&report),
            "auto_consult": self.orchestrator.auto_consult(),
        })))
    }
}

pub type GeminiRouter = ToolRouter<GeminiSvc>;

impl GeminiSvc {
    pub fn router() -> GeminiRouter {
        // Wrapper to expose the macro-generated private tool_router
        Self::tool_router()
    }
}
