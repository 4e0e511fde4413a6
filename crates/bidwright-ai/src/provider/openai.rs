//! OpenAI chat-completions adapter.

use async_trait::async_trait;
use bidwright_core::BackendConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{Generation, GenerationRequest, Provider, decode_error, non_empty, require_credential, send};
use crate::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiProvider {
    config: BackendConfig,
    client: reqwest::Client,
    label: String,
}

impl OpenAiProvider {
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
        format!("{}/v1/chat/completions", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.label
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let key = require_credential(&self.config, &self.label)?;
        debug!(provider = %self.label, json_mode = request.json_mode, "calling OpenAI");
        let body = request_body(&self.config, request);
        let raw = send(
            &self.label,
            self.client.post(self.endpoint()).bearer_auth(key).json(&body),
        )
        .await?;
        Ok(Generation {
            text: decode_response(&self.label, &raw)?,
            provider: self.label.clone(),
        })
    }
}

fn request_body(config: &BackendConfig, request: &GenerationRequest) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = &request.system_prompt {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.push(json!({"role": "user", "content": request.prompt}));

    let mut body = json!({
        "model": config.model,
        "messages": messages,
        "max_tokens": config.max_tokens,
    });
    if request.json_mode {
        body["response_format"] = json!({"type": "json_object"});
    }
    if let Some(t) = request.temperature {
        body["temperature"] = json!(t);
    }
    body
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

fn decode_response(label: &str, raw: &str) -> Result<String, ProviderError> {
    let resp: ChatResponse = serde_json::from_str(raw).map_err(|e| decode_error(label, e))?;
    let text = resp.choices.into_iter().next().and_then(|c| c.message.content);
    non_empty(label, text)
}
