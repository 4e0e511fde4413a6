use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{Generation, GenerationRequest, Provider};
use crate::ProviderError;

/// Primary with a single fallback hop to a secondary.
///
/// The returned [`Generation::provider`] names whichever provider actually
/// answered. If the secondary fails too its error is returned as is.
pub struct FailoverProvider {
    primary: Arc<dyn Provider>,
    secondary: Arc<dyn Provider>,
    name: String,
}

impl FailoverProvider {
    pub fn new(primary: Arc<dyn Provider>, secondary: Arc<dyn Provider>) -> Self {
        let name = format!("{} -> {}", primary.name(), secondary.name());
        Self {
            primary,
            secondary,
            name,
        }
    }
}

#[async_trait]
impl Provider for FailoverProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        self.primary.is_configured() || self.secondary.is_configured()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        match self.primary.generate(request).await {
            Ok(generation) => Ok(generation),
            Err(e) => {
                warn!(
                    primary = %self.primary.name(),
                    secondary = %self.secondary.name(),
                    error = %e,
                    "primary provider failed, failing over"
                );
                self.secondary.generate(request).await
            }
        }
    }
}
