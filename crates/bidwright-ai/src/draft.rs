//! Bid draft generation with retrieval context and a guaranteed fallback.

use std::sync::Arc;

use bidwright_core::tender::FALLBACK_SOURCE;
use bidwright_core::text::prefix;
use bidwright_core::{CompanyProfile, DraftResult, TaskClass};
use bidwright_store::Retriever;
use tracing::{info, warn};

use crate::provider::GenerationRequest;
use crate::router::ProviderRouter;

/// Reference chunks pulled into each drafting prompt.
pub const REFERENCE_K: usize = 2;
const REFERENCE_CHARS: usize = 1500;
const TENDER_PROMPT_CHARS: usize = 5000;
const FALLBACK_EXCERPT_CHARS: usize = 200;

/// Stand-in used when the caller supplies no tender text at all.
pub const GENERIC_TENDER_TEXT: &str = "General public sector tender requirements.";

pub struct DraftOrchestrator {
    router: Arc<ProviderRouter>,
    retriever: Option<Arc<dyn Retriever>>,
}

impl DraftOrchestrator {
    pub fn new(router: Arc<ProviderRouter>, retriever: Arc<dyn Retriever>) -> Self {
        Self {
            router,
            retriever: Some(retriever),
        }
    }

    /// Draft without reference context.
    pub fn without_retrieval(router: Arc<ProviderRouter>) -> Self {
        Self {
            router,
            retriever: None,
        }
    }

    /// Generate a proposal draft. Never fails: on total backend failure the
    /// result is a fixed-structure draft with source `fallback-error`.
    pub async fn generate_draft(&self, tender_text: &str, profile: &CompanyProfile) -> DraftResult {
        let tender_text = match tender_text.trim() {
            "" => GENERIC_TENDER_TEXT,
            _ => tender_text,
        };

        let references = self.reference_context(tender_text).await;
        let prompt = build_prompt(tender_text, profile, &references);

        let provider = self.router.select(TaskClass::Drafting);
        match provider.generate(&GenerationRequest::new(prompt)).await {
            Ok(generation) => {
                info!(
                    provider = %generation.provider,
                    references = references.len(),
                    "draft generated"
                );
                DraftResult {
                    content: generation.text,
                    source: generation.provider,
                }
            }
            Err(e) => {
                warn!(provider = %provider.name(), error = %e, "draft generation failed, using fallback");
                DraftResult {
                    content: fallback_draft(tender_text),
                    source: FALLBACK_SOURCE.to_string(),
                }
            }
        }
    }

    /// Nearest reference chunks; retrieval problems mean "no references".
    async fn reference_context(&self, query: &str) -> Vec<String> {
        let Some(retriever) = &self.retriever else {
            return Vec::new();
        };
        match retriever.query(query, REFERENCE_K).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(error = %e, "reference retrieval failed, drafting without references");
                Vec::new()
            }
        }
    }
}

pub fn build_prompt(tender_text: &str, profile: &CompanyProfile, references: &[String]) -> String {
    let reference_block = if references.is_empty() {
        String::new()
    } else {
        let joined = references.join("\n\n");
        format!(
            "REFERENCE (for style and structure only; do not copy facts) from past winning proposals:\n---\n{}\n---\n",
            prefix(&joined, REFERENCE_CHARS)
        )
    };

    format!(
        r#"You are a Senior Bid Manager for {company}. Create a strategic, winning proposal draft.

CONTEXT:
Tender: "{tender}..."
Our Profile: "{capabilities}"

{reference_block}
TASK:
Write a ~1200 word proposal that persuades the evaluator we are the only viable choice.

STRUCTURE:
1. Executive Summary: state our unique value proposition and reference specific pain points from the tender.
2. Understanding & Approach: explain how we meet the requirements better, using clear win themes.
3. Risk Mitigation: identify 2-3 risks in this contract and how we mitigate them.
4. Team & Experience: highlight relevant experience.
5. Pricing & Value: focus on return on investment, not just cost.
6. References: mention similar clients served (generic placeholder if unknown).

TONE:
Specific, authoritative, partner-focused. No filler. Active voice."#,
        company = profile.display_name(),
        tender = prefix(tender_text, TENDER_PROMPT_CHARS),
        capabilities = profile.capabilities(),
    )
}

/// Built from the tender text alone; no model involved.
pub fn fallback_draft(tender_text: &str) -> String {
    format!(
        "# Proposal Draft (Fallback)\n\n\
         ## Executive Summary\n\
         We propose to act as your delivery partner for this contract.\n\n\
         ## Requirements\n\
         Based on: {}...\n\n\
         (AI generation unavailable, please check API keys)\n",
        prefix(tender_text, FALLBACK_EXCERPT_CHARS)
    )
}
