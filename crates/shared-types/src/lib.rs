pub mod types;

pub use types::{
    AnalysisResult, Citation, Clause, ClauseAnalysis, RiskLevel, Span, UnknownRiskLevel,
};
