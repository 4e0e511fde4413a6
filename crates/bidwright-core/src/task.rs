//! Semantic task classes used to pick a generation backend strategy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of generation a caller is asking for.
///
/// Supplied per request; the router maps it (plus which backends have
/// credentials) onto a concrete provider chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskClass {
    /// Cheap, reliable, structured output (scoring, classification).
    #[default]
    FastStructured,
    /// Long inputs where context window size matters (document extraction).
    LargeContextAnalysis,
    /// Long-form prose where writing quality matters (bid drafts).
    Drafting,
}

impl TaskClass {
    pub const ALL: [TaskClass; 3] = [
        TaskClass::FastStructured,
        TaskClass::LargeContextAnalysis,
        TaskClass::Drafting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FastStructured => "fast-structured",
            Self::LargeContextAnalysis => "large-context-analysis",
            Self::Drafting => "drafting",
        }
    }
}

impl fmt::Display for TaskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task class: {0:?} (expected fast-structured, large-context-analysis or drafting)")]
pub struct UnknownTaskClass(pub String);

impl FromStr for TaskClass {
    type Err = UnknownTaskClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast-structured" | "fast" | "data" => Ok(Self::FastStructured),
            "large-context-analysis" | "context" => Ok(Self::LargeContextAnalysis),
            "drafting" | "writing" => Ok(Self::Drafting),
            _ => Err(UnknownTaskClass(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_roundtrips_through_from_str() {
        for class in TaskClass::ALL {
            assert_eq!(class.to_string().parse::<TaskClass>().unwrap(), class);
        }
    }

    #[test]
    fn legacy_aliases_accepted() {
        assert_eq!("writing".parse::<TaskClass>().unwrap(), TaskClass::Drafting);
        assert_eq!(
            "context".parse::<TaskClass>().unwrap(),
            TaskClass::LargeContextAnalysis
        );
        assert_eq!("FAST".parse::<TaskClass>().unwrap(), TaskClass::FastStructured);
    }

    #[test]
    fn unknown_class_rejected() {
        let err = "poetry".parse::<TaskClass>().unwrap_err();
        assert_eq!(err.0, "poetry");
    }

    #[test]
    fn default_is_fast_structured() {
        assert_eq!(TaskClass::default(), TaskClass::FastStructured);
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&TaskClass::LargeContextAnalysis).unwrap();
        assert_eq!(json, "\"large-context-analysis\"");
    }
}
