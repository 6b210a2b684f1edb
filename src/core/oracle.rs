//! Seams between the orchestrator and the outside world: the oracle process
//! and the throttle in front of it.

use std::{future::Future, pin::Pin, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

pub const INSTALL_HINT: &str = "npm install -g @google/gemini-cli";

/// Output of one successful oracle run.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleOutput {
    pub output: String,
    pub elapsed_seconds: f64,
}

/// Failure modes of an oracle invocation.
///
/// The `Display` text is what callers see and what error classification runs
/// over, so the wording is part of the contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    #[error("Gemini CLI command '{command}' not found. Please install with 'npm install -g @google/gemini-cli'")]
    NotFound { command: String },
    #[error("Gemini CLI timed out after {seconds} seconds")]
    Timeout { seconds: f64 },
    #[error("Gemini CLI failed (exit code {code}): {message}")]
    NonZeroExit { code: i32, message: String },
    #[error("Error executing Gemini CLI: {message}")]
    Spawn { message: String },
}

/// Something that answers a fully composed prompt.
#[async_trait]
pub trait Oracle: Send + Sync + 'static {
    async fn invoke(&self, prompt: &str) -> Result<OracleOutput, InvokeError>;
}

/// Gate that spaces out consecutive oracle invocations.
#[async_trait]
pub trait Throttle: Send + Sync + 'static {
    /// Suspends until the next invocation may proceed, then claims the slot.
    async fn await_slot(&self);

    /// Forgets the last claimed slot.
    async fn reset(&self);
}

type OracleFuture = Pin<Box<dyn Future<Output = Result<OracleOutput, InvokeError>> + Send>>;

/// Oracle backed by a plain async closure. Handy for embedding the
/// orchestrator somewhere the CLI is not available, and for tests.
#[derive(Clone)]
pub struct FnOracle {
    inner: Arc<dyn Fn(String) -> OracleFuture + Send + Sync>,
}

impl FnOracle {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OracleOutput, InvokeError>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |s| Box::pin(f(s))),
        }
    }
}

#[async_trait]
impl Oracle for FnOracle {
    async fn invoke(&self, prompt: &str) -> Result<OracleOutput, InvokeError> {
        (self.inner)(prompt.to_owned()).await
    }
}
