//! Error types shared across the discovery engine.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;

/// Engine-level error taxonomy.
///
/// Only `Config` is fatal to a pipeline run (fail-fast before any step
/// executes). Everything else is recovered locally: the affected step is
/// marked failed with the error text in its diagnostics and the waterfall
/// continues. Candidate rejections (quality filter, anti-hallucination)
/// are recorded as data on the result, never raised as errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Mandatory capability or configuration value missing/invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Fetch/timeout/HTTP failure against a single content source.
    #[error("transport error: {0}")]
    Transport(String),

    /// Anti-bot or login-wall signature detected and no rendering
    /// fallback was available to get past it.
    #[error("blocked content: {0}")]
    BlockedContent(String),

    /// The managed rendering service reported a job failure.
    #[error("render job failed: {0}")]
    RenderJob(String),

    /// The managed rendering job did not complete within the polling
    /// ceiling. Never retried within the same step.
    #[error("render job timed out after {0:?}")]
    RenderTimeout(Duration),

    /// A generative reply did not decode against the expected schema.
    /// Treated as zero candidates by callers.
    #[error("generative reply rejected: {0}")]
    ExtractionParse(String),

    /// Input record too incomplete to act on.
    #[error("insufficient input: {0}")]
    InsufficientInput(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AppError::Transport(format!("request timed out: {}", e))
        } else {
            AppError::Transport(e.to_string())
        }
    }
}
