use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub mod compose;
pub mod log;
pub mod patterns;

/// Longest query kept verbatim in the consultation log.
pub const QUERY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    Success,
    Error,
}

/// Coarse failure category used to pick a remediation hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    Timeout,
    CliNotFound,
    RateLimit,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::Timeout => "timeout",
            ErrorKind::CliNotFound => "cli_not_found",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "authentication" => Some(ErrorKind::Authentication),
            "timeout" => Some(ErrorKind::Timeout),
            "cli_not_found" => Some(ErrorKind::CliNotFound),
            "rate_limit" => Some(ErrorKind::RateLimit),
            "unknown" => Some(ErrorKind::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the consultation log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsultationRecord {
    pub id: String,
    pub timestamp: DateTime<Local>,
    pub query: String,
    pub status: ConsultationStatus,
    pub execution_time: f64,
}

impl ConsultationRecord {
    pub fn new(
        id: impl Into<String>,
        query: &str,
        status: ConsultationStatus,
        execution_time: f64,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp: Local::now(),
            query: query_preview(query),
            status,
            execution_time,
        }
    }
}

/// First 200 characters of `query`, with `...` appended when anything was cut.
pub fn query_preview(query: &str) -> String {
    match query.char_indices().nth(QUERY_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &query[..cut]),
        None => query.to_owned(),
    }
}

/// Outcome of a single `consult` call, as handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConsultationResult {
    Disabled {
        message: String,
    },
    Success {
        response: String,
        execution_time: f64,
        consultation_id: String,
        timestamp: DateTime<Local>,
    },
    Error {
        error: String,
        error_type: ErrorKind,
        consultation_id: String,
        timestamp: DateTime<Local>,
    },
}

impl ConsultationResult {
    pub fn consultation_id(&self) -> Option<&str> {
        match self {
            ConsultationResult::Disabled { .. } => None,
            ConsultationResult::Success {
                consultation_id, ..
            }
            | ConsultationResult::Error {
                consultation_id, ..
            } => Some(consultation_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsultRequest {
    pub query: String,
    pub context: String,
    pub comparison_mode: bool,
    pub force: bool,
}

impl ConsultRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            context: String::new(),
            comparison_mode: true,
            force: false,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn comparison_mode(mut self, on: bool) -> Self {
        self.comparison_mode = on;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Configuration plus log statistics, as reported by `gemini_status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub enabled: bool,
    pub auto_consult: bool,
    pub cli_command: String,
    pub model: String,
    pub timeout: u64,
    pub rate_limit_delay: f64,
    pub max_context_length: usize,
    pub log_consultations: bool,
    pub total_consultations: usize,
    pub successful_consultations: usize,
    pub failed_consultations: usize,
    pub last_consultation: Option<DateTime<Local>>,
}
