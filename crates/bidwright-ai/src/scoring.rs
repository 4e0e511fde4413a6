//! Tender/company fit scoring.

use std::sync::Arc;

use bidwright_core::{CompanyProfile, MatchScore, TaskClass, TenderSummary};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::json::parse_lenient;
use crate::provider::GenerationRequest;
use crate::router::ProviderRouter;

const HEURISTIC_BASE: u8 = 82;
const HEURISTIC_PER_KEYWORD: u8 = 2;
const HEURISTIC_MAX_BONUS: u8 = 13;
const NEUTRAL_SCORE: u8 = 60;
const NEUTRAL_RATIONALE: &str = "AI analysis failed. Defaulting to neutral score.";

pub struct MatchScorer {
    router: Arc<ProviderRouter>,
}

#[derive(Deserialize)]
struct ScoreReply {
    score: Value,
    #[serde(default)]
    rationale: String,
}

impl MatchScorer {
    pub fn new(router: Arc<ProviderRouter>) -> Self {
        Self { router }
    }

    /// Score 0..=100. Never fails; backend trouble yields a neutral 60.
    pub async fn score(&self, tender: &TenderSummary, profile: &CompanyProfile) -> MatchScore {
        let provider = self.router.select(TaskClass::FastStructured);
        if self.router.demo_mode() || !provider.is_configured() {
            return heuristic_score(tender, profile);
        }

        let request = GenerationRequest::new(scoring_prompt(tender, profile))
            .with_system("You are a precise scoring engine.")
            .with_temperature(0.2)
            .json();

        let reply = match provider.generate(&request).await {
            Ok(g) => g,
            Err(e) => {
                warn!(provider = %provider.name(), error = %e, "match scoring failed");
                return neutral();
            }
        };

        match parse_lenient::<ScoreReply>(&reply.text)
            .ok()
            .and_then(|r| Some((as_score(&r.score)?, r.rationale)))
        {
            Some((score, rationale)) => {
                info!(provider = %reply.provider, score, "scored tender");
                MatchScore { score, rationale }
            }
            None => {
                warn!(provider = %reply.provider, "unusable match score output");
                neutral()
            }
        }
    }
}

fn neutral() -> MatchScore {
    MatchScore {
        score: NEUTRAL_SCORE,
        rationale: NEUTRAL_RATIONALE.to_string(),
    }
}

/// Numbers or numeric strings, rounded and clamped to 0..=100.
fn as_score(v: &Value) -> Option<u8> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(0.0, 100.0) as u8)
}

/// Keyword-overlap estimate used when no backend is configured.
pub fn heuristic_score(tender: &TenderSummary, profile: &CompanyProfile) -> MatchScore {
    let description = tender.description.to_lowercase();
    let matches: Vec<String> = profile
        .keywords_include
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty() && description.contains(k.as_str()))
        .collect();

    let bonus = (matches.len().min(usize::from(u8::MAX)) as u8)
        .saturating_mul(HEURISTIC_PER_KEYWORD)
        .min(HEURISTIC_MAX_BONUS);
    let rationale = if matches.is_empty() {
        "High potential alignment identified based on general sector capabilities.".to_string()
    } else {
        let shown: Vec<&str> = matches.iter().take(3).map(String::as_str).collect();
        format!(
            "Strong match detected based on keywords: {}.",
            shown.join(", ")
        )
    };

    MatchScore {
        score: HEURISTIC_BASE + bonus,
        rationale: format!("{rationale} (AI Demo Mode)"),
    }
}

fn scoring_prompt(tender: &TenderSummary, profile: &CompanyProfile) -> String {
    let description = match tender.description.trim() {
        "" => "No description provided.",
        d => d,
    };
    format!(
        r#"You are an expert Bid Manager. Evaluate the fit of this tender for the company.

TENDER:
Title: {title}
Description: {description}
Budget: {budget}
Region: {region}

COMPANY:
Name: {company}
Keywords Include: {keywords}
Capabilities: {capabilities}

TASK:
1. Analyse the match based on capabilities, keywords, and region.
2. Assign a score from 0 to 100 (0 = irrelevant, 100 = perfect fit).
3. Provide a one-sentence rationale.

Return JSON: {{"score": number, "rationale": "string"}}"#,
        title = tender.title,
        budget = tender.budget,
        region = tender.region,
        company = profile.display_name(),
        keywords = profile.keywords_include.join(", "),
        capabilities = profile.capabilities(),
    )
}
