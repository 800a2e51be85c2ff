//! Analysis backend that replays a recorded analyzer response
//!
//! Two response shapes are understood: a full analysis result with clause
//! offsets, and a whole-document citation report (`status`, `message` and
//! a list of quoted findings) whose citations are located in the document.
//!
//! Analyzer failures come back as a report with an error status or as an
//! HTTP error body (`{"detail": ...}`). Both are replayed as failures so a
//! skipped analysis never shows up as a document without findings.

use std::path::PathBuf;

use async_trait::async_trait;
use review_session::{AnalysisBackend, AnalysisFailure, DocumentFile};
use risk_engine::{locate_citations, reconstruct_from_citations};
use serde::Deserialize;
use shared_types::{AnalysisResult, Citation};
use tracing::debug;

/// Code used when the analyzer reported its own failure
pub const ANALYSIS_ERROR: &str = "ANALYSIS_ERROR";

const ERROR_STATUSES: [&str; 2] = ["error", "erreur"];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordedResponse {
    Analysis(AnalysisResult),
    Report(CitationReport),
}

#[derive(Debug, Deserialize)]
struct CitationReport {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    clauses: Option<Vec<Citation>>,
}

pub struct ReplayBackend {
    response: PathBuf,
}

impl ReplayBackend {
    pub fn new(response: impl Into<PathBuf>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl AnalysisBackend for ReplayBackend {
    async fn submit_document(&self, file: &DocumentFile) -> Result<AnalysisResult, AnalysisFailure> {
        let raw = tokio::fs::read_to_string(&self.response)
            .await
            .map_err(|e| {
                AnalysisFailure::transport(format!(
                    "Failed to read recorded response {}: {}",
                    self.response.display(),
                    e
                ))
            })?;
        debug!(path = %self.response.display(), "Replaying {} bytes", raw.len());
        parse_response(&raw, file)
    }
}

/// Turn a recorded response into an analysis result for `file`
pub fn parse_response(raw: &str, file: &DocumentFile) -> Result<AnalysisResult, AnalysisFailure> {
    let response: RecordedResponse = serde_json::from_str(raw)
        .map_err(|e| AnalysisFailure::malformed(format!("Unreadable analysis response: {}", e)))?;

    match response {
        RecordedResponse::Analysis(result) => Ok(result),
        RecordedResponse::Report(report) => {
            if let Some(detail) = report.detail {
                let message = match detail {
                    serde_json::Value::String(message) => message,
                    other => other.to_string(),
                };
                return Err(AnalysisFailure::new(ANALYSIS_ERROR, message));
            }

            let failed = report.status.as_deref().is_some_and(|status| {
                ERROR_STATUSES
                    .iter()
                    .any(|e| status.trim().eq_ignore_ascii_case(e))
            });
            if failed {
                return Err(AnalysisFailure::new(
                    ANALYSIS_ERROR,
                    report
                        .message
                        .unwrap_or_else(|| "Analysis failed".to_string()),
                ));
            }

            let citations = match (report.status.is_some(), report.clauses) {
                (_, Some(citations)) => citations,
                (true, None) => Vec::new(),
                (false, None) => {
                    return Err(AnalysisFailure::malformed(
                        "Analysis response has neither a status nor clauses",
                    ))
                }
            };

            let document_text = if file.is_text() {
                file.text().into_owned()
            } else {
                reconstruct_from_citations(&citations)
            };
            let clauses = locate_citations(&document_text, &citations);
            debug!(
                located = clauses.len(),
                reported = citations.len(),
                "Located citations"
            );

            Ok(AnalysisResult {
                filename: file.name.clone(),
                document_text,
                clauses,
                risk_score_global: None,
                summary: report.message,
            })
        }
    }
}
