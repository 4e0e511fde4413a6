//! Generation layer: provider adapters with routing and failover, tender
//! extraction, bid drafting, and match scoring.
//!
//! Both outward boundaries ([`ExtractionPipeline::extract`] and
//! [`DraftOrchestrator::generate_draft`]) are total: backend trouble shows
//! up in the returned content, never as an error.

pub mod draft;
mod error;
pub mod extract;
pub mod json;
pub mod provider;
pub mod router;
pub mod scoring;

#[cfg(test)]
mod stub;

#[cfg(feature = "onnx")]
mod embedder;
#[cfg(feature = "onnx")]
pub use embedder::OnnxEmbedder;

pub use draft::DraftOrchestrator;
pub use error::{ParseError, ProviderError};
pub use extract::ExtractionPipeline;
pub use provider::{FailoverProvider, Generation, GenerationRequest, Provider};
pub use router::{ProviderRouter, Route};
pub use scoring::MatchScorer;
