//! Task class → provider chain.

use std::sync::Arc;

use bidwright_core::{AiConfig, TaskClass};
use serde::Serialize;

use crate::provider::{self, FailoverProvider, Provider};

/// Maps a [`TaskClass`] onto a provider, wrapping it in a
/// [`FailoverProvider`] where there is something to fall back to.
///
/// Built once from an explicit [`AiConfig`]; [`select`](Self::select) only
/// looks at which roles are configured and never touches the network.
pub struct ProviderRouter {
    fast: Arc<dyn Provider>,
    large_context: Arc<dyn Provider>,
    prose: Arc<dyn Provider>,
    demo_mode: bool,
}

/// What [`ProviderRouter::describe`] reports for one task class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub task_class: TaskClass,
    pub provider: String,
    pub configured: bool,
}

impl ProviderRouter {
    /// Build adapters for each role, sharing one HTTP client.
    pub fn new(config: &AiConfig) -> Self {
        let client = reqwest::Client::new();
        Self::from_providers(
            provider::from_config(&config.fast, client.clone()),
            provider::from_config(&config.large_context, client.clone()),
            provider::from_config(&config.prose, client),
        )
        .with_demo_mode(config.demo_mode)
    }

    pub fn from_providers(
        fast: Arc<dyn Provider>,
        large_context: Arc<dyn Provider>,
        prose: Arc<dyn Provider>,
    ) -> Self {
        Self {
            fast,
            large_context,
            prose,
            demo_mode: false,
        }
    }

    pub fn with_demo_mode(mut self, demo_mode: bool) -> Self {
        self.demo_mode = demo_mode;
        self
    }

    /// Heuristic extraction and scoring are forced regardless of credentials.
    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    pub fn select(&self, task: TaskClass) -> Arc<dyn Provider> {
        match task {
            TaskClass::Drafting => {
                if self.prose.is_configured() {
                    Arc::new(FailoverProvider::new(self.prose.clone(), self.fast.clone()))
                } else if self.large_context.is_configured() {
                    Arc::new(FailoverProvider::new(
                        self.large_context.clone(),
                        self.fast.clone(),
                    ))
                } else {
                    self.fast.clone()
                }
            }
            TaskClass::LargeContextAnalysis => {
                if self.large_context.is_configured() {
                    self.large_context.clone()
                } else {
                    self.fast.clone()
                }
            }
            TaskClass::FastStructured => self.fast.clone(),
        }
    }

    pub fn describe(&self, task: TaskClass) -> Route {
        let provider = self.select(task);
        Route {
            task_class: task,
            provider: provider.name().to_string(),
            configured: provider.is_configured(),
        }
    }
}
