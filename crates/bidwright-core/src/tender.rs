//! Tender records exchanged across the extraction and drafting boundaries.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Value used for any field the source document (or the model) didn't supply.
pub const UNKNOWN: &str = "Unknown";

/// Source tag reported when a draft was built without any model output.
pub const FALLBACK_SOURCE: &str = "fallback-error";

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// How hard a compliance clause bites. Anything not explicitly high is medium.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Severity {
    High,
    #[default]
    Medium,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(match raw.trim().to_ascii_uppercase().as_str() {
            "HIGH" | "CRITICAL" | "MANDATORY" => Self::High,
            _ => Self::Medium,
        })
    }
}

/// A single pass/fail requirement found in a tender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceConstraint {
    #[serde(default, alias = "requirement")]
    pub clause: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(
        default,
        alias = "page_ref",
        alias = "source_page",
        deserialize_with = "page_reference"
    )]
    pub page_reference: String,
}

impl ComplianceConstraint {
    pub fn new(clause: &str, severity: Severity, page_reference: &str) -> Self {
        Self {
            clause: clause.to_string(),
            severity,
            page_reference: page_reference.to_string(),
        }
    }
}

/// Models answer page references as `4`, `"4"`, `"p. 4"` or `null`.
fn page_reference<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PageRef {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<PageRef>::deserialize(d)? {
        Some(PageRef::Text(s)) => s.trim().to_string(),
        Some(PageRef::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

/// Structured summary of one tender document.
///
/// Produced fresh per extraction call. `is_demo` marks output of the
/// heuristic extractor so consumers can tell it apart from a real reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "summary")]
    pub description: String,
    #[serde(default = "unknown")]
    pub budget: String,
    #[serde(default = "unknown")]
    pub deadline: String,
    #[serde(default = "unknown")]
    pub region: String,
    #[serde(default, alias = "compliance_matrix")]
    pub compliance_constraints: Vec<ComplianceConstraint>,
    #[serde(default)]
    pub is_demo: bool,
}

impl ExtractionResult {
    /// Fill blanks and coerce the deadline to `YYYY-MM-DD` or [`UNKNOWN`].
    pub fn normalized(mut self) -> Self {
        self.title = non_blank(self.title, "Untitled Tender");
        self.budget = non_blank(self.budget, UNKNOWN);
        self.region = non_blank(self.region, UNKNOWN);
        self.deadline = normalize_deadline(&self.deadline);
        self.compliance_constraints
            .retain(|c| !c.clause.trim().is_empty());
        self
    }
}

fn non_blank(value: String, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Accepts `2025-06-30` or an RFC 3339 timestamp; anything else is unknown.
pub fn normalize_deadline(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.date_naive().format("%Y-%m-%d").to_string();
    }
    unknown()
}

/// Company data the drafting and scoring boundaries receive from their caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords_include: Vec<String>,
    /// Anything else the storage layer attached; carried, never interpreted.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CompanyProfile {
    pub fn display_name(&self) -> &str {
        match self.company_name.trim() {
            "" => "our company",
            name => name,
        }
    }

    pub fn capabilities(&self) -> &str {
        match self.description.trim() {
            "" => "Generic Service Provider",
            desc => desc,
        }
    }
}

/// Tender fields the match scorer looks at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenderSummary {
    pub title: String,
    pub description: String,
    pub budget: String,
    pub region: String,
}

impl From<&ExtractionResult> for TenderSummary {
    fn from(r: &ExtractionResult) -> Self {
        Self {
            title: r.title.clone(),
            description: r.description.clone(),
            budget: r.budget.clone(),
            region: r.region.clone(),
        }
    }
}

/// A generated bid draft and which backend actually wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftResult {
    pub content: String,
    pub source: String,
}

impl DraftResult {
    pub fn is_fallback(&self) -> bool {
        self.source == FALLBACK_SOURCE
    }

    /// The `{draft, meta: {source}}` shape the drafting boundary returns.
    pub fn into_response(self) -> DraftResponse {
        DraftResponse {
            draft: self.content,
            meta: DraftMeta {
                source: self.source,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftResponse {
    pub draft: String,
    pub meta: DraftMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftMeta {
    pub source: String,
}

/// Tender/company fit on a 0–100 scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScore {
    pub score: u8,
    pub rationale: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_model_output_parses() {
        let json = r#"{
            "title": "Cloud Hosting Framework",
            "description": "Hosting for council services",
            "deadline": "2025-09-01",
            "compliance_constraints": [
                {"clause": "ISO 27001", "severity": "high", "page_ref": 4},
                {"requirement": "Cyber Essentials Plus", "severity": "LOW", "page_ref": "p. 9"},
                {"clause": "Insurance £5M", "page_reference": null}
            ]
        }"#;
        let r: ExtractionResult = serde_json::from_str(json).unwrap();
        assert_eq!(r.budget, UNKNOWN);
        assert_eq!(r.region, UNKNOWN);
        assert!(!r.is_demo);
        assert_eq!(r.compliance_constraints.len(), 3);
        assert_eq!(r.compliance_constraints[0].severity, Severity::High);
        assert_eq!(r.compliance_constraints[0].page_reference, "4");
        assert_eq!(r.compliance_constraints[1].clause, "Cyber Essentials Plus");
        assert_eq!(r.compliance_constraints[1].severity, Severity::Medium);
        assert_eq!(r.compliance_constraints[1].page_reference, "p. 9");
        assert_eq!(r.compliance_constraints[2].page_reference, "");
    }

    #[test]
    fn severity_serializes_uppercase() {
        let c = ComplianceConstraint::new("GDPR", Severity::High, "8");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["severity"], "HIGH");
        assert_eq!(json["page_reference"], "8");
    }

    #[test]
    fn normalized_fills_blanks() {
        let r = ExtractionResult {
            title: "  ".into(),
            description: "d".into(),
            budget: "".into(),
            deadline: "next Tuesday".into(),
            region: "null".into(),
            compliance_constraints: vec![ComplianceConstraint::new(" ", Severity::High, "1")],
            is_demo: false,
        }
        .normalized();
        assert_eq!(r.title, "Untitled Tender");
        assert_eq!(r.budget, UNKNOWN);
        assert_eq!(r.deadline, UNKNOWN);
        assert_eq!(r.region, UNKNOWN);
        assert!(r.compliance_constraints.is_empty());
    }

    #[test]
    fn deadline_accepts_iso_date_and_timestamp() {
        assert_eq!(normalize_deadline("2025-06-30"), "2025-06-30");
        assert_eq!(normalize_deadline(" 2025-06-30T12:00:00Z "), "2025-06-30");
        assert_eq!(normalize_deadline("30/06/2025"), UNKNOWN);
        assert_eq!(normalize_deadline(UNKNOWN), UNKNOWN);
    }

    #[test]
    fn company_profile_defaults_and_extras() {
        let p: CompanyProfile =
            serde_json::from_str(r#"{"keywords_include": ["cloud"], "plan": "agency"}"#).unwrap();
        assert_eq!(p.display_name(), "our company");
        assert_eq!(p.capabilities(), "Generic Service Provider");
        assert_eq!(p.extra["plan"], "agency");
    }

    #[test]
    fn draft_response_shape() {
        let r = DraftResult {
            content: "DRAFT_OK".into(),
            source: "stub".into(),
        };
        assert!(!r.is_fallback());
        let json = serde_json::to_value(r.into_response()).unwrap();
        assert_eq!(json["draft"], "DRAFT_OK");
        assert_eq!(json["meta"]["source"], "stub");
    }
}
