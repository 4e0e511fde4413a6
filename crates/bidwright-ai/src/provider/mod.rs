//! The uniform generation contract and its vendor adapters.
//!
//! Every backend is reached through [`Provider::generate`]. Adapters are
//! thin translators between [`GenerationRequest`] and the vendor's native
//! call shape; they hold a client handle and their configuration, nothing
//! else.

use std::sync::Arc;

use async_trait::async_trait;
use bidwright_core::text::ellipsize;
use bidwright_core::{BackendConfig, BackendFamily};

use crate::ProviderError;

mod anthropic;
mod failover;
mod gemini;
mod openai;

pub use anthropic::AnthropicProvider;
pub use failover::FailoverProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Longest error body kept in [`ProviderError::Api`].
const ERROR_BODY_CHARS: usize = 500;

/// One call's worth of input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Ask for a single JSON object. Best effort: adapters without native
    /// enforcement ignore it, so callers still parse tolerantly.
    pub json_mode: bool,
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Generated text plus the label of the provider that actually wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub provider: String,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Provenance label, e.g. `anthropic:claude-3-5-sonnet-latest`.
    fn name(&self) -> &str;

    /// Whether a usable credential is present. Pure; no I/O.
    fn is_configured(&self) -> bool;

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError>;
}

/// Build the adapter for a backend's vendor family.
pub fn from_config(config: &BackendConfig, client: reqwest::Client) -> Arc<dyn Provider> {
    match config.family {
        BackendFamily::OpenAi => Arc::new(OpenAiProvider::new(config.clone(), client)),
        BackendFamily::Anthropic => Arc::new(AnthropicProvider::new(config.clone(), client)),
        BackendFamily::Gemini => Arc::new(GeminiProvider::new(config.clone(), client)),
    }
}

/// The configured credential, or fail before any network I/O.
fn require_credential<'a>(config: &'a BackendConfig, label: &str) -> Result<&'a str, ProviderError> {
    config
        .credential()
        .ok_or_else(|| ProviderError::MissingCredential {
            provider: label.to_string(),
        })
}

/// Send a prepared request and return the raw body of a 2xx response.
async fn send(label: &str, request: reqwest::RequestBuilder) -> Result<String, ProviderError> {
    let resp = request.send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ProviderError::Api {
            provider: label.to_string(),
            status: status.as_u16(),
            body: ellipsize(&body, ERROR_BODY_CHARS),
        });
    }
    Ok(body)
}

/// Shared tail of every decoder: whitespace-only output counts as empty.
fn non_empty(label: &str, text: Option<String>) -> Result<String, ProviderError> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(ProviderError::EmptyResponse {
            provider: label.to_string(),
        }),
    }
}

fn decode_error(label: &str, err: serde_json::Error) -> ProviderError {
    ProviderError::Decode {
        provider: label.to_string(),
        reason: err.to_string(),
    }
}
