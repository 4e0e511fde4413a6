//! Anthropic messages adapter. No native JSON enforcement; the hint is dropped.

use async_trait::async_trait;
use bidwright_core::BackendConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{Generation, GenerationRequest, Provider, decode_error, non_empty, require_credential, send};
use crate::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    config: BackendConfig,
    client: reqwest::Client,
    label: String,
}

impl AnthropicProvider {
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
        format!("{}/v1/messages", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.label
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let key = require_credential(&self.config, &self.label)?;
        debug!(provider = %self.label, "calling Anthropic");
        let body = request_body(&self.config, request);
        let raw = send(
            &self.label,
            self.client
                .post(self.endpoint())
                .header("x-api-key", key)
                .header("anthropic-version", API_VERSION)
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
    let mut body = json!({
        "model": config.model,
        "max_tokens": config.max_tokens,
        "messages": [{"role": "user", "content": request.prompt}],
    });
    if let Some(system) = &request.system_prompt {
        body["system"] = json!(system);
    }
    if let Some(t) = request.temperature {
        body["temperature"] = json!(t);
    }
    body
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn decode_response(label: &str, raw: &str) -> Result<String, ProviderError> {
    let resp: MessagesResponse = serde_json::from_str(raw).map_err(|e| decode_error(label, e))?;
    let text: String = resp
        .content
        .into_iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text)
        .collect();
    non_empty(label, Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidwright_core::BackendFamily;

    fn config() -> BackendConfig {
        BackendConfig::new(BackendFamily::Anthropic, "claude-3-5-sonnet-latest")
    }

    #[test]
    fn system_prompt_is_top_level() {
        let req = GenerationRequest::new("draft it").with_system("Senior bid writer");
        let body = request_body(&config(), &req);
        assert_eq!(body["system"], "Senior bid writer");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "draft it");
    }

    #[test]
    fn json_hint_is_ignored() {
        let body = request_body(&config(), &GenerationRequest::new("x").json());
        assert!(body.get("response_format").is_none());
        assert!(body.get("system").is_none());
    }

    #[test]
    fn concatenates_text_blocks() {
        let raw = r##"{"content":[
            {"type":"text","text":"# Proposal\n"},
            {"type":"tool_use","id":"t1","name":"noop","input":{}},
            {"type":"text","text":"Executive summary"}
        ]}"##;
        assert_eq!(
            decode_response("anthropic:x", raw).unwrap(),
            "# Proposal\nExecutive summary"
        );
    }

    #[test]
    fn no_text_blocks_is_empty() {
        assert!(matches!(
            decode_response("anthropic:x", r#"{"content":[]}"#),
            Err(ProviderError::EmptyResponse { .. })
        ));
    }
}
