//! Presentation order and tallies for the findings list

use serde::Serialize;
use shared_types::{Clause, RiskLevel};

/// Clauses needing attention (critical, moderate) first, then the rest.
/// Order within each group follows the analysis result.
pub fn review_order(clauses: &[Clause]) -> Vec<&Clause> {
    let (mut ordered, rest): (Vec<&Clause>, Vec<&Clause>) = clauses
        .iter()
        .partition(|c| c.risk_level().is_some_and(|r| r.needs_attention()));
    ordered.extend(rest);
    ordered
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskCounts {
    pub critical: u32,
    pub moderate: u32,
    pub low: u32,
    pub unscored: u32,
}

impl RiskCounts {
    pub fn from_clauses(clauses: &[Clause]) -> Self {
        let mut counts = Self::default();
        for clause in clauses {
            match clause.risk_level() {
                Some(RiskLevel::Critical) => counts.critical += 1,
                Some(RiskLevel::Moderate) => counts.moderate += 1,
                Some(RiskLevel::Low) => counts.low += 1,
                None => counts.unscored += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> u32 {
        self.critical + self.moderate + self.low + self.unscored
    }
}
