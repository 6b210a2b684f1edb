use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::core::orchestrator::Orchestrator;
use crate::domain::patterns::detect_triggers;
use crate::domain::{ConsultRequest, ConsultationResult};
use crate::infra::boot::build_orchestrator;
use crate::infra::config::{Config, GeminiConfig};
use crate::infra::runtime::limits::make_http_client;
use crate::tools::gemini::format;

#[derive(Parser)]
#[command(name = "gemini-mcp-gateway")]
#[command(about = "Gemini second-opinion MCP gateway")]
#[command(version)]
pub struct Cli {
    /// Directory containing gemini-config.json (defaults to GEMINI_PROJECT_ROOT, then cwd)
    #[arg(long, global = true)]
    pub project_root: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the MCP server (stdio or HTTP, per MODE)
    Serve,
    /// Health check the service
    Health {
        /// Service URL to check
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
    /// Validate configuration
    Config {
        /// Validate config without starting service
        #[arg(long)]
        validate: bool,
    },
    /// Show effective Gemini configuration
    Status,
    /// Report which consultation triggers a piece of text hits
    Detect {
        text: String,
    },
    /// Run a single consultation and print the result
    Consult {
        query: String,
        #[arg(short, long, default_value = "")]
        context: String,
        /// Send the bare question without the second-opinion framing
        #[arg(long)]
        no_comparison: bool,
        /// Skip the rate limiter
        #[arg(long)]
        force: bool,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    crate::infra::logging::init_with(cli.debug);

    let root = resolve_project_root(cli.project_root);
    run_commands(cli.command.unwrap_or(Commands::Serve), &root).await
}

fn resolve_project_root(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| Config::from_env().project_root)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub async fn run_commands(command: Commands, project_root: &Path) -> ExitCode {
    match command {
        Commands::Serve => match crate::infra::boot::run_server(project_root).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "server exited with error");
                eprintln!("❌ Server failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Health { url } => match health_check(&url).await {
            Ok(_) => {
                println!("✅ Service is healthy");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Health check failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Config { validate: _ } => match validate_config(project_root) {
            Ok(_) => {
                println!("✅ Configuration is valid");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Configuration validation failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Status => match build_orchestrator(project_root) {
            Ok(orch) => {
                println!("{}", format::status(&orch.status()));
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Configuration validation failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Detect { text } => {
            let report = detect_triggers(&text);
            println!("{}", format::triggers(&report));
            if report.triggered {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Commands::Consult {
            query,
            context,
            no_comparison,
            force,
        } => {
            let orch = match build_orchestrator(project_root) {
                Ok(orch) => orch,
                Err(e) => {
                    eprintln!("❌ Configuration validation failed: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            let req = ConsultRequest::new(query)
                .with_context(context)
                .comparison_mode(!no_comparison)
                .force(force);
            consult_once(&orch, req).await
        }
    }
}

async fn consult_once(orch: &Orchestrator, req: ConsultRequest) -> ExitCode {
    let result = orch.consult(req).await;
    let text = format::consultation(orch, &result);
    match result {
        ConsultationResult::Success { .. } => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("{text}");
            ExitCode::FAILURE
        }
    }
}

async fn health_check(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let response = make_http_client()
        .get(format!("{}/healthz", url))
        .timeout(std::time::Duration::from_millis(500))
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(format!("HTTP {}", response.status()).into())
    }
}

fn validate_config(project_root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    Config::from_env().validate()?;

    // A broken config file is fatal here even though the server tolerates it.
    let mut gemini = match GeminiConfig::from_dir(project_root)? {
        Some((cfg, path)) => {
            println!("📄 Using {}", path.display());
            cfg
        }
        None => GeminiConfig::default(),
    };
    gemini.apply_env();
    gemini.validate()?;
    Ok(())
}
