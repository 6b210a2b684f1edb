//! Markdown renderings of orchestrator results, as shown to MCP clients.

use crate::core::orchestrator::Orchestrator;
use crate::domain::patterns::TriggerReport;
use crate::domain::{ConsultationResult, StatusSnapshot};

pub fn consultation(orch: &Orchestrator, result: &ConsultationResult) -> String {
    match result {
        ConsultationResult::Success {
            response,
            execution_time,
            consultation_id,
            ..
        } => format!(
            "🤖 **Gemini Second Opinion**\n\n{response}\n\n\
             ⏱️ *Consultation completed in {execution_time:.2}s*\n\
             📋 *Consultation ID: {consultation_id}*"
        ),
        ConsultationResult::Disabled { message } => format!(
            "⚠️ **Gemini Integration Disabled**\n\n{message}\n\n\
             Set GEMINI_ENABLED=true or update gemini-config.json to enable it."
        ),
        ConsultationResult::Error {
            error, error_type, ..
        } => format!(
            "❌ **Gemini Consultation Failed**\n\n**Error:** {error}\n\n**Suggestion:** {}",
            orch.error_suggestion(*error_type)
        ),
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "✅ Yes"
    } else {
        "❌ No"
    }
}

pub fn status(s: &StatusSnapshot) -> String {
    let mut out = String::from("🤖 **Gemini Integration Status**\n\n");
    out.push_str(&format!("• **Enabled**: {}\n", yes_no(s.enabled)));
    out.push_str(&format!("• **Auto-consult**: {}\n", yes_no(s.auto_consult)));
    out.push_str(&format!("• **CLI Command**: {}\n", s.cli_command));
    out.push_str(&format!("• **Model**: {}\n", s.model));
    out.push_str(&format!("• **Rate Limit**: {}s between calls\n", s.rate_limit_delay));
    out.push_str(&format!("• **Timeout**: {}s\n", s.timeout));
    out.push_str(&format!("• **Max Context**: {} characters\n", s.max_context_length));

    out.push_str("\n📊 **Statistics**:\n");
    out.push_str(&format!("• **Total Consultations**: {}\n", s.total_consultations));
    out.push_str(&format!("• **Successful**: {}\n", s.successful_consultations));
    out.push_str(&format!("• **Failed**: {}\n", s.failed_consultations));
    if let Some(last) = s.last_consultation {
        out.push_str(&format!(
            "• **Last Consultation**: {}\n",
            last.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    out
}

pub fn toggle(enabled: bool) -> String {
    if enabled {
        "🔄 **Auto-consultation enabled**\n\n\
         Gemini will be consulted automatically when uncertainty is detected."
            .to_string()
    } else {
        "🔄 **Auto-consultation disabled**\n\n\
         Gemini will only be consulted when explicitly requested."
            .to_string()
    }
}

pub fn triggers(report: &TriggerReport) -> String {
    if !report.triggered {
        return "✅ **No consultation triggers detected**".to_string();
    }
    let mut out = format!(
        "🔍 **Consultation triggers detected** ({})\n\n",
        report.matches.len()
    );
    for m in &report.matches {
        out.push_str(&format!("• {m}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oracle::{FnOracle, InvokeError, OracleOutput};
    use crate::domain::patterns::detect_triggers;
    use crate::domain::ErrorKind;
    use crate::infra::config::GeminiConfig;
    use crate::infra::runtime::limits::RateLimiter;
    use chrono::Local;
    use std::sync::Arc;
    use std::time::Duration;

    fn orch() -> Orchestrator {
        Orchestrator::with_parts(
            GeminiConfig::default(),
            Arc::new(RateLimiter::new(Duration::ZERO)),
            Arc::new(FnOracle::new(|_p: String| async {
                Err::<OracleOutput, _>(InvokeError::Spawn {
                    message: "unused".into(),
                })
            })),
        )
    }

    #[test]
    fn success_shows_response_time_and_id() {
        let text = consultation(
            &orch(),
            &ConsultationResult::Success {
                response: "Use JWT.".into(),
                execution_time: 1.234,
                consultation_id: "consult_1_0".into(),
                timestamp: Local::now(),
            },
        );
        assert!(text.starts_with("🤖 **Gemini Second Opinion**"));
        assert!(text.contains("Use JWT."));
        assert!(text.contains("completed in 1.23s"));
        assert!(text.contains("Consultation ID: consult_1_0"));
    }

    #[test]
    fn error_includes_suggestion() {
        let text = consultation(
            &orch(),
            &ConsultationResult::Error {
                error: "Gemini CLI timed out after 60 seconds".into(),
                error_type: ErrorKind::Timeout,
                consultation_id: "consult_1_1".into(),
                timestamp: Local::now(),
            },
        );
        assert!(text.contains("**Error:** Gemini CLI timed out after 60 seconds"));
        assert!(text.contains("GEMINI_TIMEOUT"));
    }

    #[test]
    fn disabled_mentions_how_to_enable() {
        let text = consultation(
            &orch(),
            &ConsultationResult::Disabled {
                message: "Gemini integration is disabled".into(),
            },
        );
        assert!(text.contains("Disabled"));
        assert!(text.contains("GEMINI_ENABLED=true"));
    }

    #[test]
    fn status_lists_settings_and_counts() {
        let text = status(&orch().status());
        assert!(text.contains("• **Enabled**: ✅ Yes"));
        assert!(text.contains("• **Model**: gemini-2.5-flash"));
        assert!(text.contains("• **Rate Limit**: 2s between calls"));
        assert!(text.contains("• **Total Consultations**: 0"));
        assert!(!text.contains("Last Consultation"));
    }

    #[test]
    fn toggle_and_trigger_texts() {
        assert!(toggle(true).contains("enabled"));
        assert!(toggle(false).contains("disabled"));
        assert!(triggers(&detect_triggers("plain")).contains("No consultation triggers"));
        let hit = triggers(&detect_triggers("maybe"));
        assert!(hit.contains(r"uncertainty: \bmaybe\b"));
    }
}
