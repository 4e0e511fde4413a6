//! In-process provider for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ProviderError;
use crate::provider::{Generation, GenerationRequest, Provider};

enum Behaviour {
    Reply(String),
    Fail,
    Unconfigured,
}

pub(crate) struct StubProvider {
    name: String,
    behaviour: Behaviour,
    calls: AtomicUsize,
    last: Mutex<Option<GenerationRequest>>,
}

impl StubProvider {
    fn build(name: &str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behaviour,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        })
    }

    /// Configured; always answers `reply`.
    pub(crate) fn ok(name: &str, reply: &str) -> Arc<Self> {
        Self::build(name, Behaviour::Reply(reply.to_string()))
    }

    /// Configured; always fails with a 503.
    pub(crate) fn failing(name: &str) -> Arc<Self> {
        Self::build(name, Behaviour::Fail)
    }

    /// No credential; fails like a real adapter would.
    pub(crate) fn unconfigured(name: &str) -> Arc<Self> {
        Self::build(name, Behaviour::Unconfigured)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<GenerationRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        !matches!(self.behaviour, Behaviour::Unconfigured)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());
        match &self.behaviour {
            Behaviour::Reply(text) => Ok(Generation {
                text: text.clone(),
                provider: self.name.clone(),
            }),
            Behaviour::Fail => Err(ProviderError::Api {
                provider: self.name.clone(),
                status: 503,
                body: "overloaded".into(),
            }),
            Behaviour::Unconfigured => Err(ProviderError::MissingCredential {
                provider: self.name.clone(),
            }),
        }
    }
}
