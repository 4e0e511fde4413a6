//! Raw tender text → [`ExtractionResult`].
//!
//! Two degraded shapes stand in for a real extraction: the heuristic
//! (demo) result when no backend is available, and the parse-failure
//! placeholder when a backend answered with something unusable. Nothing
//! escapes [`ExtractionPipeline::extract`] as an error.

use std::sync::Arc;

use bidwright_core::tender::UNKNOWN;
use bidwright_core::text::{char_len, ellipsize, prefix};
use bidwright_core::{ComplianceConstraint, ExtractionResult, Severity, TaskClass};
use thiserror::Error;
use tracing::{info, warn};

use crate::json::parse_lenient;
use crate::provider::{GenerationRequest, Provider};
use crate::router::ProviderRouter;
use crate::{ParseError, ProviderError};

/// Characters of document text sent to the model.
pub const PROMPT_PREFIX_CHARS: usize = 50_000;

const SYSTEM_PROMPT: &str = "You are a precise tender data extraction engine.";
const PARSE_FAILURE_TITLE: &str = "Error Parsing Tender";
const HEURISTIC_TITLE_MIN_CHARS: usize = 10;
const HEURISTIC_TITLE_MAX_CHARS: usize = 100;
const HEURISTIC_DESCRIPTION_CHARS: usize = 300;

#[derive(Error, Debug)]
enum ExtractError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub struct ExtractionPipeline {
    router: Arc<ProviderRouter>,
}

impl ExtractionPipeline {
    pub fn new(router: Arc<ProviderRouter>) -> Self {
        Self { router }
    }

    /// Extract structured tender data. Always returns a well-formed result.
    pub async fn extract(&self, document_text: &str) -> ExtractionResult {
        let provider = self.router.select(TaskClass::LargeContextAnalysis);
        if self.router.demo_mode() || !provider.is_configured() {
            info!(
                chars = char_len(document_text),
                "no extraction backend available, using heuristic extraction"
            );
            return heuristic_extraction(document_text);
        }

        match extract_with(provider.as_ref(), document_text).await {
            Ok(result) => result,
            Err(e) => {
                warn!(provider = %provider.name(), error = %e, "extraction failed, returning placeholder");
                parse_failure(&e.to_string())
            }
        }
    }
}

async fn extract_with(
    provider: &dyn Provider,
    document_text: &str,
) -> Result<ExtractionResult, ExtractError> {
    let request = GenerationRequest::new(extraction_prompt(document_text))
        .with_system(SYSTEM_PROMPT)
        .with_temperature(0.1)
        .json();
    let generation = provider.generate(&request).await?;
    let mut result: ExtractionResult = parse_lenient(&generation.text)?;
    result.is_demo = false;
    info!(
        provider = %generation.provider,
        clauses = result.compliance_constraints.len(),
        "extracted tender"
    );
    Ok(result.normalized())
}

fn extraction_prompt(document_text: &str) -> String {
    format!(
        r#"You are a veteran Bid Manager. Analyse this tender document and extract the critical data.

TEXT:
{text}

Return exactly one JSON object with these fields:
- "title": a concise title
- "description": a short summary
- "budget": the estimated contract value if stated, otherwise "Unknown"
- "deadline": the submission deadline as YYYY-MM-DD, otherwise "Unknown"
- "region": the location or region served
- "compliance_constraints": a list of objects with "clause", "severity" ("HIGH" or "MEDIUM") and "page_ref"
  Focus on certifications (ISO), financial thresholds and guarantees, hard deadlines, and pass/fail criteria.

Return ONLY valid JSON."#,
        text = prefix(document_text, PROMPT_PREFIX_CHARS),
    )
}

/// Deterministic stand-in used when no backend is configured.
///
/// The clause list is illustrative, not read from the document; `is_demo`
/// marks the result so consumers never mistake it for a real extraction.
pub fn heuristic_extraction(document_text: &str) -> ExtractionResult {
    let title = document_text
        .lines()
        .map(str::trim)
        .find(|l| char_len(l) > HEURISTIC_TITLE_MIN_CHARS)
        .map(|l| prefix(l, HEURISTIC_TITLE_MAX_CHARS).to_string())
        .unwrap_or_else(|| "Extracted Tender Document".to_string());

    ExtractionResult {
        title,
        description: format!("{}...", prefix(document_text, HEURISTIC_DESCRIPTION_CHARS)),
        budget: "£500,000 - £1,000,000 (Est.)".into(),
        deadline: "2025-06-30".into(),
        region: "United Kingdom".into(),
        compliance_constraints: vec![
            ComplianceConstraint::new("ISO 27001 Certification Required", Severity::High, "4"),
            ComplianceConstraint::new("Minimum Annual Turnover > £5M", Severity::High, "12"),
            ComplianceConstraint::new("Social Value: Net Zero Plan", Severity::Medium, "22"),
            ComplianceConstraint::new("GDPR Data Protection Compliance", Severity::High, "8"),
        ],
        is_demo: true,
    }
}

fn parse_failure(reason: &str) -> ExtractionResult {
    ExtractionResult {
        title: PARSE_FAILURE_TITLE.into(),
        description: ellipsize(&format!("Extraction failed: {reason}"), 500),
        budget: UNKNOWN.into(),
        deadline: UNKNOWN.into(),
        region: UNKNOWN.into(),
        compliance_constraints: Vec::new(),
        is_demo: false,
    }
}
