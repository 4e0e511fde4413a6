//! Backend configuration consumed by the provider router.
//!
//! Configuration is resolved by the caller (CLI flags, environment, a
//! secrets store) and handed to the router as a plain value. Nothing in the
//! library crates reads the process environment.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder key shipped in sample `.env` files. Treated as absent.
pub const MOCK_API_KEY: &str = "sk-mock-key";

/// Vendor API family a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendFamily {
    OpenAi,
    Anthropic,
    Gemini,
}

impl BackendFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for BackendFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generation backend: which vendor, which model, and its credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub family: BackendFamily,
    pub model: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Override for the vendor endpoint (proxies, gateways).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    4000
}

impl BackendConfig {
    pub fn new(family: BackendFamily, model: impl Into<String>) -> Self {
        Self {
            family,
            model: model.into(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    pub fn with_base_url(mut self, url: Option<String>) -> Self {
        self.base_url = url;
        self
    }

    /// The credential, if it is present and not a placeholder.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != MOCK_API_KEY)
    }

    pub fn is_configured(&self) -> bool {
        self.credential().is_some()
    }

    /// Provenance label reported with generated output, e.g. `openai:gpt-4o-mini`.
    pub fn label(&self) -> String {
        format!("{}:{}", self.family, self.model)
    }
}

/// Role → backend assignment for the router.
///
/// Which vendor fills which role is configuration: swap `prose` to Gemini
/// and `large_context` to Anthropic and the routing policy is unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Cheap, reliable workhorse. Always selected as the last resort.
    pub fast: BackendConfig,
    /// Backend with the largest context window.
    pub large_context: BackendConfig,
    /// Backend with the best long-form prose.
    pub prose: BackendConfig,
    /// Force heuristic (demo) extraction and scoring even when credentials exist.
    #[serde(default)]
    pub demo_mode: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            fast: BackendConfig::new(BackendFamily::OpenAi, "gpt-4o-mini"),
            large_context: BackendConfig::new(BackendFamily::Gemini, "gemini-1.5-pro"),
            prose: BackendConfig::new(BackendFamily::Anthropic, "claude-3-5-sonnet-latest"),
            demo_mode: false,
        }
    }
}

impl AiConfig {
    /// True when at least one backend has a usable credential.
    pub fn any_configured(&self) -> bool {
        self.fast.is_configured() || self.large_context.is_configured() || self.prose.is_configured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_unconfigured() {
        let cfg = BackendConfig::new(BackendFamily::OpenAi, "gpt-4o-mini");
        assert!(!cfg.is_configured());
    }

    #[test]
    fn blank_and_mock_keys_are_unconfigured() {
        let blank = BackendConfig::new(BackendFamily::OpenAi, "m").with_api_key(Some("  ".into()));
        let mock =
            BackendConfig::new(BackendFamily::OpenAi, "m").with_api_key(Some(MOCK_API_KEY.into()));
        assert!(!blank.is_configured());
        assert!(!mock.is_configured());
    }

    #[test]
    fn real_key_is_configured_and_trimmed() {
        let cfg = BackendConfig::new(BackendFamily::Anthropic, "claude")
            .with_api_key(Some(" sk-ant-123 ".into()));
        assert_eq!(cfg.credential(), Some("sk-ant-123"));
    }

    #[test]
    fn label_combines_family_and_model() {
        let cfg = BackendConfig::new(BackendFamily::Gemini, "gemini-1.5-pro");
        assert_eq!(cfg.label(), "gemini:gemini-1.5-pro");
    }

    #[test]
    fn default_config_has_nothing_configured() {
        let cfg = AiConfig::default();
        assert!(!cfg.any_configured());
        assert_eq!(cfg.fast.family, BackendFamily::OpenAi);
        assert_eq!(cfg.prose.family, BackendFamily::Anthropic);
    }

    #[test]
    fn api_key_never_serialized() {
        let cfg = BackendConfig::new(BackendFamily::OpenAi, "gpt-4o")
            .with_api_key(Some("sk-secret".into()));
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
