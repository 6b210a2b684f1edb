use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    gemini_mcp_gateway::cli::run().await
}
