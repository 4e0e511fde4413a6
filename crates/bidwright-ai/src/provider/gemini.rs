//! Google Gemini `generateContent` adapter.

use async_trait::async_trait;
use bidwright_core::BackendConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{Generation, GenerationRequest, Provider, decode_error, non_empty, require_credential, send};
use crate::ProviderError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiProvider {
    config: BackendConfig,
    client: reqwest::Client,
    label: String,
}

impl GeminiProvider {
    pub fn new(config: BackendConfig, client: reqwest::Client) -> Self {
        let label = config.label();
        Self {
            config,
            client,
            label,
        }
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!(
            "{}/v1beta/models/{}:generateContent",
            base.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.label
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let key = require_credential(&self.config, &self.label)?;
        debug!(provider = %self.label, json_mode = request.json_mode, "calling Gemini");
        let body = request_body(&self.config, request);
        let raw = send(
            &self.label,
            self.client
                .post(self.endpoint())
                .header("x-goog-api-key", key)
                .json(&body),
        )
        .await?;
        Ok(Generation {
            text: decode_response(&self.label, &raw)?,
            provider: self.label.clone(),
        })
    }
}

fn request_body(config: &BackendConfig, request: &GenerationRequest) -> Value {
    let mut generation = json!({"maxOutputTokens": config.max_tokens});
    if request.json_mode {
        generation["responseMimeType"] = json!("application/json");
    }
    if let Some(t) = request.temperature {
        generation["temperature"] = json!(t);
    }

    let mut body = json!({
        "contents": [{"role": "user", "parts": [{"text": request.prompt}]}],
        "generationConfig": generation,
    });
    if let Some(system) = &request.system_prompt {
        body["systemInstruction"] = json!({"parts": [{"text": system}]});
    }
    body
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

fn decode_response(label: &str, raw: &str) -> Result<String, ProviderError> {
    let resp: GenerateResponse = serde_json::from_str(raw).map_err(|e| decode_error(label, e))?;
    let text = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>());
    non_empty(label, text)
}
