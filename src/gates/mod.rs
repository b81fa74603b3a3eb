//! External scoring gate contracts
//!
//! Every gate call is modeled as a result with an explicit failure value;
//! the pipeline treats any error (timeout, network, malformed provider
//! response) as non-decisive and falls through to the next stage. Nothing
//! in this module ever panics past the pipeline boundary.

pub mod deep_analysis;
pub mod reputation;

pub use deep_analysis::{build_prompt, parse_verdict_response, GeminiClient, InferenceBackend, OllamaClient};
pub use reputation::{ReputationReport, VirusTotalGate};

use thiserror::Error;

/// Errors from any external gate call
#[derive(Error, Debug)]
pub enum GateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Reputation lookup capability (IP or URL indicator).
///
/// Implementations must be time-bounded by their own HTTP client; callers
/// additionally wrap invocations in an explicit deadline.
#[allow(async_fn_in_trait)]
pub trait IndicatorSource {
    async fn check_indicator(&self, indicator: &str) -> Result<ReputationReport, GateError>;
}

/// Deep-analysis capability: unstructured text in, raw provider text out.
/// Response validation and parsing belong to the caller, not the backend.
#[allow(async_fn_in_trait)]
pub trait InferenceClient {
    async fn infer(&self, prompt: &str) -> Result<String, GateError>;
}
