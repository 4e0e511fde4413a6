//! Shared types for tender extraction, drafting, and backend routing.

pub mod config;
pub mod task;
pub mod tender;
pub mod text;
pub mod viability;

pub use config::{AiConfig, BackendConfig, BackendFamily};
pub use task::TaskClass;
pub use tender::{
    CompanyProfile, ComplianceConstraint, DraftResponse, DraftResult, ExtractionResult,
    MatchScore, Severity, TenderSummary,
};
pub use viability::bid_viability;
