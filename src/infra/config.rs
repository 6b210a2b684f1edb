use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::GatewayError;

pub const CONFIG_FILE_JSON: &str = "gemini-config.json";
pub const CONFIG_FILE_TOML: &str = "gemini-config.toml";

/// Process-level settings: how the gateway is served.
pub struct Config {
    pub mode: String, // "server" or "stdio"
    pub port: u16,
    /// Directory searched for `gemini-config.json`.
    pub project_root: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let mode = std::env::var("MODE").unwrap_or_else(|_| "server".into());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        let project_root = std::env::var("GEMINI_PROJECT_ROOT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Self {
            mode,
            port,
            project_root,
        }
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if !matches!(self.mode.as_str(), "server" | "stdio") {
            return Err(GatewayError::InvalidConfig(format!(
                "Invalid MODE: {}. Must be 'server' or 'stdio'",
                self.mode
            )));
        }
        if self.mode == "server" && self.port == 0 {
            return Err(GatewayError::InvalidConfig("PORT cannot be 0".into()));
        }
        Ok(())
    }
}

/// Settings for the Gemini consultation subsystem. Missing fields fall back
/// to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub enabled: bool,
    pub auto_consult: bool,
    pub cli_command: String,
    /// Seconds allowed for one oracle run.
    pub timeout: u64,
    /// Minimum seconds between two oracle runs.
    pub rate_limit_delay: f64,
    pub max_context_length: usize,
    pub model: String,
    pub log_consultations: bool,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_consult: true,
            cli_command: "gemini".into(),
            timeout: 60,
            rate_limit_delay: 2.0,
            max_context_length: 4000,
            model: "gemini-2.5-flash".into(),
            log_consultations: true,
        }
    }
}

impl GeminiConfig {
    /// Config file from `project_root` (if any) with environment overrides on top.
    /// A broken file is reported and ignored rather than aborting startup.
    pub fn load(project_root: &Path) -> Self {
        let mut cfg = match Self::from_dir(project_root) {
            Ok(Some((cfg, path))) => {
                tracing::info!(path = %path.display(), "loaded gemini configuration");
                cfg
            }
            Ok(None) => {
                tracing::info!(
                    root = %project_root.display(),
                    "no gemini config file found, using defaults"
                );
                Self::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load gemini config file, using defaults");
                Self::default()
            }
        };
        let applied = cfg.apply_env();
        if applied > 0 {
            tracing::info!(overrides = applied, "applied environment variable overrides");
        }
        cfg
    }

    /// Reads `gemini-config.json`, or `gemini-config.toml` when no JSON file exists.
    pub fn from_dir(project_root: &Path) -> Result<Option<(Self, PathBuf)>, GatewayError> {
        let json = project_root.join(CONFIG_FILE_JSON);
        if json.is_file() {
            return Self::from_file(&json).map(|c| Some((c, json)));
        }
        let toml_path = project_root.join(CONFIG_FILE_TOML);
        if toml_path.is_file() {
            return Self::from_file(&toml_path).map(|c| Some((c, toml_path)));
        }
        Ok(None)
    }

    pub fn from_file(path: &Path) -> Result<Self, GatewayError> {
        let raw = std::fs::read_to_string(path).map_err(|source| GatewayError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = if path.extension().is_some_and(|e| e == "toml") {
            toml::from_str::<Self>(&raw).map_err(|e| e.to_string())
        } else {
            serde_json::from_str::<Self>(&raw).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| GatewayError::ConfigParse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn apply_env(&mut self) -> usize {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `GEMINI_*` overrides found through `lookup`. Values that fail to
    /// parse are skipped with a warning. Returns how many were applied.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> usize {
        fn flag(v: &str) -> bool {
            v.trim().eq_ignore_ascii_case("true")
        }
        fn parsed<T: std::str::FromStr>(key: &str, v: &str) -> Option<T> {
            match v.trim().parse::<T>() {
                Ok(t) => Some(t),
                Err(_) => {
                    tracing::warn!(key, value = v, "ignoring invalid environment override");
                    None
                }
            }
        }
        let mut applied = 0;
        if let Some(v) = lookup("GEMINI_ENABLED") {
            self.enabled = flag(&v);
            applied += 1;
        }
        if let Some(v) = lookup("GEMINI_AUTO_CONSULT") {
            self.auto_consult = flag(&v);
            applied += 1;
        }
        if let Some(v) = lookup("GEMINI_LOG_CONSULTATIONS") {
            self.log_consultations = flag(&v);
            applied += 1;
        }
        if let Some(v) = lookup("GEMINI_CLI_COMMAND") {
            self.cli_command = v;
            applied += 1;
        }
        if let Some(v) = lookup("GEMINI_MODEL") {
            self.model = v;
            applied += 1;
        }
        if let Some(t) = lookup("GEMINI_TIMEOUT").and_then(|v| parsed("GEMINI_TIMEOUT", &v)) {
            self.timeout = t;
            applied += 1;
        }
        if let Some(d) =
            lookup("GEMINI_RATE_LIMIT").and_then(|v| parsed("GEMINI_RATE_LIMIT", &v))
        {
            self.rate_limit_delay = d;
            applied += 1;
        }
        if let Some(n) =
            lookup("GEMINI_MAX_CONTEXT").and_then(|v| parsed("GEMINI_MAX_CONTEXT", &v))
        {
            self.max_context_length = n;
            applied += 1;
        }
        applied
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.cli_command.trim().is_empty() {
            return Err(GatewayError::InvalidConfig("cli_command cannot be empty".into()));
        }
        if self.timeout == 0 {
            return Err(GatewayError::InvalidConfig("timeout must be at least 1 second".into()));
        }
        if !self.rate_limit_delay.is_finite() || self.rate_limit_delay < 0.0 {
            return Err(GatewayError::InvalidConfig(format!(
                "rate_limit_delay must be a non-negative number, got {}",
                self.rate_limit_delay
            )));
        }
        if self.max_context_length == 0 {
            return Err(GatewayError::InvalidConfig("max_context_length cannot be 0".into()));
        }
        Ok(())
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn rate_limit_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.rate_limit_delay).unwrap_or(Duration::ZERO)
    }

    /// `None` when no model is configured, so the CLI picks its own default.
    pub fn model_flag(&self) -> Option<&str> {
        let m = self.model.trim();
        (!m.is_empty()).then_some(m)
    }
}
