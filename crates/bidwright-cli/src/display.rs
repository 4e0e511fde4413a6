//! Vertical card display for extraction results.
//!
//! Renders an [`ExtractionResult`] as a grouped, human-readable card:
//! identity, commercial terms, then the compliance matrix.

use std::fmt;

use bidwright_core::tender::UNKNOWN;
use bidwright_core::{ExtractionResult, MatchScore, Severity};

const MAX_LIST_ITEMS: usize = 10;
const LABEL_WIDTH: usize = 14;

// ── Public API ──

/// Print an extraction result as a card.
pub fn print_extraction_card(result: &ExtractionResult) {
    print!("{}", ExtractionCard(result));
}

pub fn print_score(score: &MatchScore) {
    println!("{:>3}/100  {}", score.score, score.rationale);
}

/// Display adapter rendering an [`ExtractionResult`] as a card.
pub struct ExtractionCard<'a>(pub &'a ExtractionResult);

impl fmt::Display for ExtractionCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        writeln!(f, "=== {} ===", result.title)?;
        if result.is_demo {
            writeln!(f, "(demo extraction: no AI backend configured)")?;
        }
        writeln!(f)?;

        section(
            f,
            "Identity",
            &[("description", &result.description), ("region", &result.region)],
        )?;
        section(
            f,
            "Commercial",
            &[("budget", &result.budget), ("deadline", &result.deadline)],
        )?;
        compliance(f, result)
    }
}

// ── Section rendering ──

/// A labelled group of fields; unknown or blank values are skipped, and so
/// is the whole section when nothing is left.
fn section(f: &mut fmt::Formatter<'_>, header: &str, fields: &[(&str, &str)]) -> fmt::Result {
    let known: Vec<_> = fields
        .iter()
        .filter(|(_, v)| !v.trim().is_empty() && *v != UNKNOWN)
        .collect();
    if known.is_empty() {
        return Ok(());
    }

    writeln!(f, "{header}")?;
    for (label, value) in known {
        let mut lines = value.lines();
        let first = lines.next().unwrap_or_default();
        writeln!(f, "  {label:<LABEL_WIDTH$} {first}")?;
        for more in lines {
            writeln!(f, "  {:<LABEL_WIDTH$} {more}", "")?;
        }
    }
    writeln!(f)
}

fn compliance(f: &mut fmt::Formatter<'_>, result: &ExtractionResult) -> fmt::Result {
    let clauses = &result.compliance_constraints;
    if clauses.is_empty() {
        return Ok(());
    }

    let high = clauses.iter().filter(|c| c.severity == Severity::High).count();
    writeln!(f, "Compliance Matrix ({} clauses, {high} high)", clauses.len())?;
    for c in clauses.iter().take(MAX_LIST_ITEMS) {
        let page = match c.page_reference.as_str() {
            "" => String::new(),
            p => format!("  (p. {p})"),
        };
        writeln!(f, "  [{:<6}] {}{page}", c.severity.as_str(), c.clause)?;
    }
    if clauses.len() > MAX_LIST_ITEMS {
        writeln!(f, "  ... and {} more", clauses.len() - MAX_LIST_ITEMS)?;
    }
    writeln!(f)
}
