use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::core::oracle::{InvokeError, Oracle, OracleOutput, INSTALL_HINT};
use crate::infra::config::GeminiConfig;

/// Runs the Gemini CLI as a child process, one process per prompt.
#[derive(Debug, Clone)]
pub struct GeminiCli {
    command: String,
    model: Option<String>,
    timeout: Duration,
}

impl GeminiCli {
    pub fn new(command: impl Into<String>, model: Option<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            model,
            timeout,
        }
    }

    pub fn from_config(cfg: &GeminiConfig) -> Self {
        Self::new(
            cfg.cli_command.clone(),
            cfg.model_flag().map(str::to_owned),
            cfg.timeout_duration(),
        )
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// `[-m <model>] -p <prompt>`. The prompt is one argv element; no shell is involved.
    pub fn build_args(&self, prompt: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(4);
        if let Some(model) = &self.model {
            args.push("-m".to_string());
            args.push(model.clone());
        }
        args.push("-p".to_string());
        args.push(prompt.to_string());
        args
    }

    pub async fn run(&self, prompt: &str) -> Result<OracleOutput, InvokeError> {
        let start = Instant::now();
        // never log the prompt itself
        tracing::debug!(
            command = %self.command,
            model = ?self.model,
            prompt_chars = prompt.chars().count(),
            "executing gemini cli"
        );

        let mut child = Command::new(&self.command)
            .args(self.build_args(prompt))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => InvokeError::NotFound {
                    command: self.command.clone(),
                },
                _ => InvokeError::Spawn {
                    message: e.to_string(),
                },
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let finished = tokio::time::timeout(self.timeout, async {
            let (out, err, status) =
                tokio::join!(read_pipe(stdout), read_pipe(stderr), child.wait());
            status.map(|s| (s, out, err))
        })
        .await;

        let (status, out, err) = match finished {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                return Err(InvokeError::Spawn {
                    message: e.to_string(),
                })
            }
            Err(_) => {
                // Kill and reap so a hung CLI does not outlive the call.
                if let Err(e) = child.start_kill() {
                    tracing::warn!(error = %e, "failed to kill timed out gemini cli");
                }
                let _ = child.wait().await;
                let seconds = self.timeout.as_secs_f64();
                tracing::error!(seconds, "gemini cli timed out");
                return Err(InvokeError::Timeout { seconds });
            }
        };

        let elapsed_seconds = start.elapsed().as_secs_f64();
        if !status.success() {
            let code = status.code().unwrap_or(-1);
            let message = describe_failure(&self.command, &err);
            tracing::error!(code, "gemini cli exited with failure");
            return Err(InvokeError::NonZeroExit { code, message });
        }

        tracing::debug!(elapsed_seconds, "gemini cli completed");
        Ok(OracleOutput {
            output: out.trim().to_string(),
            elapsed_seconds,
        })
    }
}

#[async_trait]
impl Oracle for GeminiCli {
    async fn invoke(&self, prompt: &str) -> Result<OracleOutput, InvokeError> {
        self.run(prompt).await
    }
}

/// stderr text plus a remediation tip when the failure looks familiar.
fn describe_failure(command: &str, stderr: &str) -> String {
    let mut message = match stderr.trim_end() {
        "" => "Unknown error".to_string(),
        s => s.to_string(),
    };
    let lower = message.to_lowercase();
    if lower.contains("authentication") {
        message.push_str(&format!(
            "\nTip: Run '{command}' interactively to authenticate with your Google account"
        ));
    } else if lower.contains("command not found") || lower.contains("not recognized") {
        message.push_str(&format!("\nTip: Install Gemini CLI with '{INSTALL_HINT}'"));
    }
    message
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut p) = pipe {
        if let Err(e) = p.read_to_end(&mut buf).await {
            tracing::warn!(error = %e, "failed to read gemini cli output");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
