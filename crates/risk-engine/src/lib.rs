pub mod annotate;
pub mod error;
pub mod locate;
pub mod review;
pub mod scoring;

use serde::Serialize;
use shared_types::AnalysisResult;

pub use annotate::{annotate, validate_span, Annotation, Segment};
pub use error::{AnnotateError, ScoringError};
pub use locate::{locate_citations, reconstruct_document, reconstruct_from_citations};
pub use review::{review_order, RiskCounts};
pub use scoring::{DeductionWeights, RiskScore, RiskScorer, ScoreSource, ScoringConfig};

/// Everything the presentation layer renders for one analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReview {
    pub annotation: Annotation,
    pub score: RiskScore,
    pub counts: RiskCounts,
}

/// RiskEngine entry point
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    scorer: RiskScorer,
}

impl RiskEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            scorer: RiskScorer::new(config),
        }
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    /// Annotate and score an analysis result
    pub fn review(&self, result: &AnalysisResult) -> DocumentReview {
        DocumentReview {
            annotation: annotate(&result.document_text, &result.clauses),
            score: self.scorer.score_document(result),
            counts: RiskCounts::from_clauses(&result.clauses),
        }
    }
}
