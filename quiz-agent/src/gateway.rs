//! Acquisition gateway - one timeout-bounded generator call per acquisition.
//!
//! The gateway turns generator output into an untrusted [`Candidate`]. It
//! neither validates nor deduplicates, and it never retries; those belong to
//! the caller.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use quiz_bank::{Candidate, Category};

use crate::backend::traits::{BackendError, CompletionRequest, GeneratorBackend};
use crate::prompt::PromptBuilder;

/// Why an acquisition produced no candidate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    /// The bound elapsed before the generator answered
    #[error("Acquisition timed out after {0:?}")]
    Timeout(Duration),

    /// Network failure, non-success status, or backend refusal
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The generator answered but the body is not a JSON object
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl AcquireError {
    /// Whether this is the timeout failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AcquireError::Timeout(_))
    }
}

impl From<BackendError> for AcquireError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::ParseError(msg) => AcquireError::MalformedResponse(msg),
            other => AcquireError::Upstream(other.to_string()),
        }
    }
}

/// Sampling parameters for generation requests.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Maximum tokens per reply
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

/// Boundary wrapper around the generator backend.
pub struct AcquisitionGateway {
    backend: Arc<dyn GeneratorBackend>,
    config: GatewayConfig,
}

impl AcquisitionGateway {
    /// Create a gateway over a backend.
    pub fn new(backend: Arc<dyn GeneratorBackend>) -> Self {
        Self {
            backend,
            config: GatewayConfig::default(),
        }
    }

    /// Create with configuration.
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Issue one generator request for `category`.
    ///
    /// With `timeout` set, the in-flight request is dropped when the bound
    /// elapses, so a late reply can never surface. With `None` only the
    /// backend's own limits apply.
    pub async fn acquire(
        &self,
        category: Category,
        timeout: Option<Duration>,
    ) -> Result<Candidate, AcquireError> {
        let request = CompletionRequest::user(PromptBuilder::item_prompt(category))
            .with_system(PromptBuilder::system_prompt())
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature)
            .with_json_output();

        debug!(category = %category, backend = %self.backend.id(), ?timeout, "Acquiring candidate");

        let call = self.backend.complete(request);
        let response = match timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                warn!(category = %category, ?limit, "Generator call timed out");
                AcquireError::Timeout(limit)
            })??,
            None => call.await?,
        };

        parse_candidate(&response.content)
    }
}

/// Parse generator text into a candidate. Tolerates a Markdown code fence.
pub fn parse_candidate(content: &str) -> Result<Candidate, AcquireError> {
    let body = strip_code_fence(content);

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| AcquireError::MalformedResponse(e.to_string()))?;

    if !value.is_object() {
        return Err(AcquireError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    }

    Ok(Candidate::new(value))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag, e.g. ```json
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
