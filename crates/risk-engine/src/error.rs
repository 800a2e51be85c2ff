use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnotateError {
    #[error("Invalid span for clause {clause_id}: [{start}, {end}) in a document of {len} characters")]
    InvalidSpan {
        clause_id: u32,
        start: usize,
        end: usize,
        len: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Invalid thresholds: moderate_above ({moderate_above}) must not exceed critical_above ({critical_above})")]
    InvertedThresholds {
        moderate_above: f64,
        critical_above: f64,
    },

    #[error("Threshold out of range: {0} (expected 0-100)")]
    ThresholdOutOfRange(f64),
}
