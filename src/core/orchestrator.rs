//! The consultation facade: gate, throttle, compose, invoke, record, classify.
//!
//! One [`Orchestrator`] is built at startup and shared (behind an `Arc`) by
//! every transport session. All of its mutable state is internally
//! synchronized, so `consult` may be called concurrently.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;

use crate::clients::GeminiCli;
use crate::core::oracle::{Oracle, Throttle};
use crate::domain::compose::QueryComposer;
use crate::domain::log::ConsultationLog;
use crate::domain::{
    ConsultRequest, ConsultationRecord, ConsultationResult, ConsultationStatus, ErrorKind,
    StatusSnapshot,
};
use crate::infra::config::GeminiConfig;
use crate::infra::logging::{log_count, log_metric};
use crate::infra::runtime::limits::RateLimiter;

pub const DISABLED_MESSAGE: &str = "Gemini integration is disabled";
const GENERIC_SUGGESTION: &str = "Please check the error message and try again.";

pub struct Orchestrator {
    config: GeminiConfig,
    auto_consult: AtomicBool,
    composer: QueryComposer,
    throttle: Arc<dyn Throttle>,
    oracle: Arc<dyn Oracle>,
    log: Mutex<ConsultationLog>,
    sequence: AtomicU64,
}

impl Orchestrator {
    /// Wires the real rate limiter and Gemini CLI from `config`.
    pub fn new(config: GeminiConfig) -> Self {
        let throttle = Arc::new(RateLimiter::new(config.rate_limit_duration()));
        let oracle = Arc::new(GeminiCli::from_config(&config));
        Self::with_parts(config, throttle, oracle)
    }

    pub fn with_parts(
        config: GeminiConfig,
        throttle: Arc<dyn Throttle>,
        oracle: Arc<dyn Oracle>,
    ) -> Self {
        tracing::info!(
            enabled = config.enabled,
            auto_consult = config.auto_consult,
            "gemini orchestrator initialized"
        );
        Self {
            auto_consult: AtomicBool::new(config.auto_consult),
            composer: QueryComposer::new(config.max_context_length),
            config,
            throttle,
            oracle,
            log: Mutex::new(ConsultationLog::new()),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub fn auto_consult(&self) -> bool {
        self.auto_consult.load(Ordering::SeqCst)
    }

    /// Runs one consultation. Never fails: oracle errors come back as
    /// [`ConsultationResult::Error`].
    pub async fn consult(&self, req: ConsultRequest) -> ConsultationResult {
        if !self.config.enabled {
            tracing::warn!("consultation requested while gemini integration is disabled");
            return ConsultationResult::Disabled {
                message: DISABLED_MESSAGE.to_string(),
            };
        }

        if !req.force {
            self.throttle.await_slot().await;
        }

        let consultation_id = self.next_consultation_id();
        tracing::info!(id = %consultation_id, "starting gemini consultation");

        let prompt = self
            .composer
            .compose(&req.query, &req.context, req.comparison_mode);

        match self.oracle.invoke(&prompt).await {
            Ok(out) => {
                self.record(
                    &consultation_id,
                    &req.query,
                    ConsultationStatus::Success,
                    out.elapsed_seconds,
                );
                ConsultationResult::Success {
                    response: out.output,
                    execution_time: out.elapsed_seconds,
                    consultation_id,
                    timestamp: Local::now(),
                }
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!(
                    id = %consultation_id,
                    error = %error,
                    "gemini consultation failed"
                );
                // failure timings are not comparable with successful runs
                self.record(&consultation_id, &req.query, ConsultationStatus::Error, 0.0);
                ConsultationResult::Error {
                    error_type: classify_error(&error),
                    error,
                    consultation_id,
                    timestamp: Local::now(),
                }
            }
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        let snap = self.log().snapshot();
        StatusSnapshot {
            enabled: self.config.enabled,
            auto_consult: self.auto_consult(),
            cli_command: self.config.cli_command.clone(),
            model: self.config.model.clone(),
            timeout: self.config.timeout,
            rate_limit_delay: self.config.rate_limit_delay,
            max_context_length: self.config.max_context_length,
            log_consultations: self.config.log_consultations,
            total_consultations: snap.total,
            successful_consultations: snap.successful,
            failed_consultations: snap.failed,
            last_consultation: snap.last_timestamp,
        }
    }

    /// Sets the advisory auto-consult flag, or flips it when `enable` is `None`.
    /// Returns the new value.
    pub fn set_auto_consult(&self, enable: Option<bool>) -> bool {
        let now = match enable {
            Some(v) => {
                self.auto_consult.store(v, Ordering::SeqCst);
                v
            }
            None => !self.auto_consult.fetch_xor(true, Ordering::SeqCst),
        };
        tracing::info!(auto_consult = now, "auto-consultation updated");
        now
    }

    pub fn error_suggestion(&self, kind: ErrorKind) -> String {
        match kind {
            ErrorKind::Authentication => "Authentication required. Please run 'gemini' command \
                 interactively to authenticate with your Google account."
                .to_string(),
            ErrorKind::Timeout => format!(
                "Request timed out after {} seconds. Try increasing GEMINI_TIMEOUT environment \
                 variable or check your network connection.",
                self.config.timeout
            ),
            ErrorKind::CliNotFound => "Gemini CLI not found. Please install it with: \
                 'npm install -g @google/gemini-cli'"
                .to_string(),
            ErrorKind::RateLimit => format!(
                "Rate limit exceeded. Please wait before making another request. \
                 Current rate limit: {} seconds between calls.",
                self.config.rate_limit_delay
            ),
            ErrorKind::Unknown => GENERIC_SUGGESTION.to_string(),
        }
    }

    /// String-keyed lookup; unrecognized types get the generic suggestion.
    pub fn error_suggestion_for(&self, error_type: &str) -> String {
        ErrorKind::parse(error_type)
            .map(|k| self.error_suggestion(k))
            .unwrap_or_else(|| GENERIC_SUGGESTION.to_string())
    }

    /// Clears history and throttle state and restores the configured
    /// auto-consult flag.
    pub async fn reset(&self) {
        self.log().clear();
        self.throttle.reset().await;
        self.auto_consult
            .store(self.config.auto_consult, Ordering::SeqCst);
    }

    fn next_consultation_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        format!("consult_{}_{}", Local::now().timestamp(), seq)
    }

    fn record(&self, id: &str, query: &str, status: ConsultationStatus, elapsed: f64) {
        let label = match status {
            ConsultationStatus::Success => "consultations_success_total",
            ConsultationStatus::Error => "consultations_error_total",
        };
        log_count("consult_gemini", label);
        if status == ConsultationStatus::Success {
            log_metric("consult_gemini", "consultation_seconds", elapsed);
        }

        if !self.config.log_consultations {
            return;
        }
        self.log()
            .append(ConsultationRecord::new(id, query, status, elapsed));
        tracing::info!(id, ?status, elapsed_seconds = elapsed, "consultation logged");
    }

    fn log(&self) -> MutexGuard<'_, ConsultationLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Maps a raw failure message to its category. Case-insensitive substring
/// checks in priority order; the first hit wins.
pub fn classify_error(message: &str) -> ErrorKind {
    let m = message.to_lowercase();
    if m.contains("authentication") {
        ErrorKind::Authentication
    } else if m.contains("timeout") || m.contains("timed out") {
        ErrorKind::Timeout
    } else if m.contains("not found") {
        ErrorKind::CliNotFound
    } else if m.contains("rate limit") {
        ErrorKind::RateLimit
    } else {
        ErrorKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oracle::{FnOracle, InvokeError, OracleOutput};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingThrottle {
        slots: AtomicUsize,
        resets: AtomicUsize,
    }

    #[async_trait]
    impl Throttle for CountingThrottle {
        async fn await_slot(&self) {
            self.slots.fetch_add(1, Ordering::SeqCst);
        }
        async fn reset(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting_oracle(
        calls: Arc<AtomicUsize>,
        reply: Result<OracleOutput, InvokeError>,
    ) -> Arc<dyn Oracle> {
        Arc::new(FnOracle::new(move |_prompt: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            let reply = reply.clone();
            async move { reply }
        }))
    }

    fn ok_reply(text: &str) -> Result<OracleOutput, InvokeError> {
        Ok(OracleOutput {
            output: text.to_string(),
            elapsed_seconds: 1.5,
        })
    }

    fn orchestrator(
        config: GeminiConfig,
        reply: Result<OracleOutput, InvokeError>,
    ) -> (Orchestrator, Arc<CountingThrottle>, Arc<AtomicUsize>) {
        let throttle = Arc::new(CountingThrottle::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let orch = Orchestrator::with_parts(
            config,
            throttle.clone(),
            counting_oracle(calls.clone(), reply),
        );
        (orch, throttle, calls)
    }

    #[tokio::test]
    async fn disabled_short_circuits_everything() {
        let cfg = GeminiConfig {
            enabled: false,
            ..GeminiConfig::default()
        };
        let (orch, throttle, calls) = orchestrator(cfg, ok_reply("never"));

        let res = orch.consult(ConsultRequest::new("anything")).await;
        assert_eq!(
            res,
            ConsultationResult::Disabled {
                message: DISABLED_MESSAGE.into()
            }
        );
        assert_eq!(throttle.slots.load(Ordering::SeqCst), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(orch.status().total_consultations, 0);
    }

    #[tokio::test]
    async fn success_is_returned_and_logged() {
        let (orch, throttle, calls) =
            orchestrator(GeminiConfig::default(), ok_reply("Gemini analysis response"));

        let res = orch.consult(ConsultRequest::new("Is this safe?")).await;
        match &res {
            ConsultationResult::Success {
                response,
                execution_time,
                consultation_id,
                ..
            } => {
                assert_eq!(response, "Gemini analysis response");
                assert_eq!(*execution_time, 1.5);
                assert!(consultation_id.starts_with("consult_"));
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(throttle.slots.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let status = orch.status();
        assert_eq!(status.total_consultations, 1);
        assert_eq!(status.successful_consultations, 1);
        assert!(status.last_consultation.is_some());
    }

    #[tokio::test]
    async fn force_skips_the_throttle() {
        let (orch, throttle, calls) = orchestrator(GeminiConfig::default(), ok_reply("ok"));
        orch.consult(ConsultRequest::new("q").force(true)).await;
        assert_eq!(throttle.slots.load(Ordering::SeqCst), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn oracle_receives_composed_prompt() {
        let seen = Arc::new(Mutex::new(String::new()));
        let sink = seen.clone();
        let oracle = Arc::new(FnOracle::new(move |prompt: String| {
            *sink.lock().unwrap() = prompt;
            async { ok_reply("fine") }
        }));
        let orch = Orchestrator::with_parts(
            GeminiConfig::default(),
            Arc::new(CountingThrottle::default()),
            oracle,
        );
        orch.consult(
            ConsultRequest::new("How to implement authentication?")
                .with_context("Building a REST API"),
        )
        .await;
        let prompt = seen.lock().unwrap().clone();
        assert!(prompt.contains("Context:\nBuilding a REST API"));
        assert!(prompt.contains("Question/Topic:\nHow to implement authentication?"));
        assert!(prompt.contains("Please structure your response with:"));
    }

    #[tokio::test]
    async fn failures_are_logged_with_zero_time_and_classified() {
        let (orch, _, _) = orchestrator(
            GeminiConfig::default(),
            Err(InvokeError::Timeout { seconds: 60.0 }),
        );
        let res = orch.consult(ConsultRequest::new("slow one")).await;
        match res {
            ConsultationResult::Error {
                error, error_type, ..
            } => {
                assert_eq!(error, "Gemini CLI timed out after 60 seconds");
                assert_eq!(error_type, ErrorKind::Timeout);
            }
            other => panic!("expected error, got {other:?}"),
        }
        let log = orch.log();
        let rec = log.entries().next().unwrap();
        assert_eq!(rec.status, ConsultationStatus::Error);
        assert_eq!(rec.execution_time, 0.0);
    }

    #[tokio::test]
    async fn each_invoke_error_maps_to_its_kind() {
        let cases = [
            (
                InvokeError::NonZeroExit {
                    code: 1,
                    message: "Authentication failed".into(),
                },
                ErrorKind::Authentication,
            ),
            (
                InvokeError::NotFound {
                    command: "gemini".into(),
                },
                ErrorKind::CliNotFound,
            ),
            (
                InvokeError::NonZeroExit {
                    code: 1,
                    message: "Rate limit exceeded".into(),
                },
                ErrorKind::RateLimit,
            ),
            (
                InvokeError::Spawn {
                    message: "permission denied".into(),
                },
                ErrorKind::Unknown,
            ),
        ];
        for (err, expected) in cases {
            let (orch, _, _) = orchestrator(GeminiConfig::default(), Err(err));
            match orch.consult(ConsultRequest::new("q")).await {
                ConsultationResult::Error { error_type, .. } => assert_eq!(error_type, expected),
                other => panic!("expected error, got {other:?}"),
            }
        }
    }

    #[test]
    fn classification_follows_priority_order() {
        assert_eq!(classify_error("Authentication required"), ErrorKind::Authentication);
        assert_eq!(classify_error("Request timed out"), ErrorKind::Timeout);
        assert_eq!(classify_error("connection timeout"), ErrorKind::Timeout);
        assert_eq!(classify_error("Command not found"), ErrorKind::CliNotFound);
        assert_eq!(classify_error("RATE LIMIT exceeded"), ErrorKind::RateLimit);
        assert_eq!(classify_error("Some other error"), ErrorKind::Unknown);
        // authentication outranks everything after it
        assert_eq!(
            classify_error("authentication service not found"),
            ErrorKind::Authentication
        );
        assert_eq!(classify_error("timed out: rate limit"), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn log_toggle_disables_history() {
        let cfg = GeminiConfig {
            log_consultations: false,
            ..GeminiConfig::default()
        };
        let (orch, _, calls) = orchestrator(cfg, ok_reply("ok"));
        orch.consult(ConsultRequest::new("q")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(orch.status().total_consultations, 0);
    }

    #[tokio::test]
    async fn log_is_capped_and_previews_long_queries() {
        let (orch, _, _) = orchestrator(GeminiConfig::default(), ok_reply("ok"));
        for i in 0..105 {
            orch.consult(ConsultRequest::new(format!("q{i}")).force(true))
                .await;
        }
        assert_eq!(orch.status().total_consultations, 100);
        assert_eq!(orch.log().entries().next().unwrap().query, "q5");

        orch.consult(ConsultRequest::new("x".repeat(300)).force(true))
            .await;
        let log = orch.log();
        let last = log.entries().last().unwrap();
        assert_eq!(last.query.chars().count(), 203);
        assert!(last.query.ends_with("..."));
    }

    #[tokio::test]
    async fn consultation_ids_are_unique() {
        let (orch, _, _) = orchestrator(GeminiConfig::default(), ok_reply("ok"));
        let a = orch.consult(ConsultRequest::new("a").force(true)).await;
        let b = orch.consult(ConsultRequest::new("b").force(true)).await;
        assert_ne!(a.consultation_id(), b.consultation_id());
    }

    #[test]
    fn toggle_auto_consult() {
        let (orch, _, _) = orchestrator(GeminiConfig::default(), ok_reply("ok"));
        assert!(orch.auto_consult());
        assert!(!orch.set_auto_consult(None));
        assert!(orch.set_auto_consult(None));
        assert!(!orch.set_auto_consult(Some(false)));
        assert!(!orch.set_auto_consult(Some(false)));
        assert!(!orch.status().auto_consult);
    }

    #[test]
    fn suggestions_cover_every_kind() {
        let cfg = GeminiConfig {
            timeout: 90,
            rate_limit_delay: 3.5,
            ..GeminiConfig::default()
        };
        let (orch, _, _) = orchestrator(cfg, ok_reply("ok"));
        assert!(orch
            .error_suggestion(ErrorKind::Authentication)
            .to_lowercase()
            .contains("authentication"));
        let timeout = orch.error_suggestion(ErrorKind::Timeout);
        assert!(timeout.contains("90 seconds"));
        assert!(timeout.to_lowercase().contains("timeout"));
        assert!(orch
            .error_suggestion(ErrorKind::CliNotFound)
            .to_lowercase()
            .contains("install"));
        let rate = orch.error_suggestion(ErrorKind::RateLimit);
        assert!(rate.to_lowercase().contains("rate limit"));
        assert!(rate.contains("3.5 seconds"));
        assert_eq!(orch.error_suggestion(ErrorKind::Unknown), GENERIC_SUGGESTION);
        assert_eq!(orch.error_suggestion_for("no_such_type"), GENERIC_SUGGESTION);
        assert_eq!(
            orch.error_suggestion_for("cli_not_found"),
            orch.error_suggestion(ErrorKind::CliNotFound)
        );
    }

    #[test]
    fn status_reports_configuration() {
        let cfg = GeminiConfig {
            cli_command: "custom-gemini".into(),
            model: "gemini-pro".into(),
            timeout: 120,
            rate_limit_delay: 5.0,
            ..GeminiConfig::default()
        };
        let (orch, _, _) = orchestrator(cfg, ok_reply("ok"));
        let s = orch.status();
        assert!(s.enabled);
        assert_eq!(s.cli_command, "custom-gemini");
        assert_eq!(s.model, "gemini-pro");
        assert_eq!(s.timeout, 120);
        assert_eq!(s.rate_limit_delay, 5.0);
        assert_eq!(s.max_context_length, 4000);
        assert_eq!(s.last_consultation, None);
    }

    #[tokio::test]
    async fn reset_restores_a_clean_state() {
        let (orch, throttle, _) = orchestrator(GeminiConfig::default(), ok_reply("ok"));
        orch.consult(ConsultRequest::new("q")).await;
        orch.set_auto_consult(Some(false));

        orch.reset().await;
        assert_eq!(orch.status().total_consultations, 0);
        assert!(orch.auto_consult());
        assert_eq!(throttle.resets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn real_rate_limiter_spaces_consultations() {
        let cfg = GeminiConfig {
            rate_limit_delay: 0.1,
            ..GeminiConfig::default()
        };
        let oracle = counting_oracle(Arc::new(AtomicUsize::new(0)), ok_reply("ok"));
        let orch = Orchestrator::with_parts(
            cfg.clone(),
            Arc::new(RateLimiter::new(cfg.rate_limit_duration())),
            oracle,
        );
        let start = std::time::Instant::now();
        orch.consult(ConsultRequest::new("a")).await;
        orch.consult(ConsultRequest::new("b")).await;
        assert!(start.elapsed() >= std::time::Duration::from_millis(100));
    }
}
