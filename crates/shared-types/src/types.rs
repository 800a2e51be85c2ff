use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Discrete risk classification shared by clauses and document scores.
///
/// Deserialization accepts the canonical names as well as the labels the
/// French analysis backends emit (`ROUGE`/`ORANGE`/`VERT`,
/// `Critique`/`Moyen`/`Faible`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String")]
pub enum RiskLevel {
    Low,
    Moderate,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Critical => "Critical",
        }
    }

    /// Critical and moderate findings need the reader's attention.
    pub fn needs_attention(&self) -> bool {
        matches!(self, RiskLevel::Moderate | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown risk level: {0}")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" | "VERT" | "Faible" => Ok(RiskLevel::Low),
            "Moderate" | "ORANGE" | "Moyen" | "Avertissement" => Ok(RiskLevel::Moderate),
            "Critical" | "ROUGE" | "Critique" => Ok(RiskLevel::Critical),
            other => Err(UnknownRiskLevel(other.to_string())),
        }
    }
}

impl TryFrom<String> for RiskLevel {
    type Error = UnknownRiskLevel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Half-open character range `[start, end)` into a document's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseAnalysis {
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub legal_reference: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// A flagged excerpt of the source document.
///
/// `start_index`/`end_index` are authoritative; `text` is only the excerpt
/// the backend reported and is never used to slice the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub id: u32,
    #[serde(default)]
    pub text: String,
    pub start_index: usize,
    pub end_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ClauseAnalysis>,
}

impl Clause {
    pub fn span(&self) -> Span {
        Span::new(self.start_index, self.end_index)
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.analysis.as_ref().map(|a| a.risk_level)
    }
}

/// Output of one analysis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub filename: String,
    #[serde(default)]
    pub document_text: String,
    #[serde(default)]
    pub clauses: Vec<Clause>,
    /// Document-level score (0-100) when the backend computed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score_global: Option<f64>,
    #[serde(default, alias = "message", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl AnalysisResult {
    /// First clause id that appears more than once, if any
    pub fn duplicate_clause_id(&self) -> Option<u32> {
        let mut seen = std::collections::HashSet::with_capacity(self.clauses.len());
        self.clauses
            .iter()
            .map(|c| c.id)
            .find(|id| !seen.insert(*id))
    }

    pub fn clause(&self, id: u32) -> Option<&Clause> {
        self.clauses.iter().find(|c| c.id == id)
    }
}

/// A finding reported as an exact quotation, without offsets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(alias = "citation_exacte")]
    pub text: String,
    #[serde(alias = "niveau_risque")]
    pub risk_level: RiskLevel,
    #[serde(default, alias = "explication")]
    pub explanation: String,
    #[serde(default, alias = "conseil", skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_reference: Option<String>,
}

impl Citation {
    pub fn to_analysis(&self) -> ClauseAnalysis {
        ClauseAnalysis {
            risk_level: self.risk_level,
            score: 0.0,
            legal_reference: self.legal_reference.clone().unwrap_or_default(),
            explanation: self.explanation.clone(),
            recommendation: self.recommendation.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_risk_level_accepts_backend_labels() {
        let levels: Vec<RiskLevel> =
            serde_json::from_str(r#"["ROUGE", "ORANGE", "VERT", "Critique", "Moyen", "Faible"]"#)
                .unwrap();
        assert_eq!(
            levels,
            vec![
                RiskLevel::Critical,
                RiskLevel::Moderate,
                RiskLevel::Low,
                RiskLevel::Critical,
                RiskLevel::Moderate,
                RiskLevel::Low,
            ]
        );
    }

    #[test]
    fn test_risk_level_serializes_canonical_name() {
        let json = serde_json::to_string(&RiskLevel::Moderate).unwrap();
        assert_eq!(json, r#""Moderate""#);
    }

    #[test]
    fn test_unknown_risk_level_is_rejected() {
        assert!("ERREUR".parse::<RiskLevel>().is_err());
        assert!(serde_json::from_str::<RiskLevel>(r#""rouge""#).is_err());
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Critical > RiskLevel::Moderate);
        assert!(RiskLevel::Moderate > RiskLevel::Low);
        assert!(!RiskLevel::Low.needs_attention());
    }

    #[test]
    fn test_parse_backend_response() {
        let json = r#"{
            "filename": "bail.pdf",
            "total_clauses": 1,
            "risk_score_global": 50.0,
            "clauses": [{
                "id": 1,
                "text": "Le loyer est de 800 euros.",
                "start_index": 0,
                "end_index": 26,
                "analysis": {
                    "risk_level": "ORANGE",
                    "score": 0.5,
                    "legal_reference": "Loi Alur",
                    "explanation": "Ambigu",
                    "recommendation": "Preciser"
                }
            }]
        }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.filename, "bail.pdf");
        assert_eq!(result.document_text, "");
        assert_eq!(result.risk_score_global, Some(50.0));
        assert_eq!(result.clauses[0].risk_level(), Some(RiskLevel::Moderate));
        assert_eq!(result.clauses[0].span(), Span::new(0, 26));
    }

    #[test]
    fn test_parse_citation_with_french_keys() {
        let json = r#"{
            "citation_exacte": "strictement interdite",
            "niveau_risque": "Critique",
            "explication": "Clause abusive",
            "conseil": "Supprimer"
        }"#;
        let citation: Citation = serde_json::from_str(json).unwrap();
        assert_eq!(citation.text, "strictement interdite");
        assert_eq!(citation.risk_level, RiskLevel::Critical);

        let analysis = citation.to_analysis();
        assert_eq!(analysis.recommendation.as_deref(), Some("Supprimer"));
        assert_eq!(analysis.legal_reference, "");
    }

    #[test]
    fn test_duplicate_clause_id() {
        let clause = |id| Clause {
            id,
            text: String::new(),
            start_index: 0,
            end_index: 1,
            analysis: None,
        };
        let mut result = AnalysisResult {
            filename: "a.txt".into(),
            document_text: "ab".into(),
            clauses: vec![clause(1), clause(2)],
            risk_score_global: None,
            summary: None,
        };
        assert_eq!(result.duplicate_clause_id(), None);

        result.clauses.push(clause(1));
        assert_eq!(result.duplicate_clause_id(), Some(1));
    }

    #[test]
    fn test_span_overlap() {
        assert!(Span::new(0, 5).overlaps(&Span::new(4, 8)));
        assert!(!Span::new(0, 5).overlaps(&Span::new(5, 8)));
        assert_eq!(Span::new(3, 3).len(), 0);
        assert!(Span::new(3, 3).is_empty());
    }
}
