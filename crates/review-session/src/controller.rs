//! Analysis view state machine
//!
//! Drives one document through selection, analysis and display:
//!
//! ```text
//! Idle --select_file--> Ready --submit--> Analyzing --on_success--> Results
//!  ^                                          |                        |
//!  +------------------on_failure / cancel-----+                        |
//!  +-------------------------------reset-------------------------------+
//! ```
//!
//! Each submission carries a sequence number. Completions whose number is
//! not the in-flight request are discarded, so a cancelled or superseded
//! request can never overwrite the view.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use risk_engine::{
    reconstruct_document, review_order, AnnotateError, DocumentReview, RiskCounts, RiskEngine,
    RiskScore, Segment,
};
use shared_types::{AnalysisResult, Clause};
use tracing::{debug, info, warn};

use crate::backend::{AcceptedFormats, AnalysisBackend, AnalysisFailure, DocumentFile};
use crate::config::LexiscanConfig;
use crate::error::SessionError;
use crate::registry::RecentDocumentsRegistry;
use crate::store::KeyValueStore;

/// Coarse view state, for hosts that only need to pick a screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Ready,
    Analyzing,
    Results,
}

#[derive(Debug)]
pub enum ViewState {
    Idle,
    Ready { file: DocumentFile },
    Analyzing { file: DocumentFile, seq: u64 },
    Results(Box<AnalysisView>),
}

impl ViewState {
    pub fn phase(&self) -> Phase {
        match self {
            ViewState::Idle => Phase::Idle,
            ViewState::Ready { .. } => Phase::Ready,
            ViewState::Analyzing { .. } => Phase::Analyzing,
            ViewState::Results(_) => Phase::Results,
        }
    }
}

/// A finished analysis ready for display
#[derive(Debug, Clone)]
pub struct AnalysisView {
    pub result: AnalysisResult,
    pub review: DocumentReview,
    selected_clause: Option<u32>,
}

impl AnalysisView {
    pub fn segments(&self) -> &[Segment] {
        &self.review.annotation.segments
    }

    pub fn score(&self) -> &RiskScore {
        &self.review.score
    }

    pub fn counts(&self) -> RiskCounts {
        self.review.counts
    }

    /// Clauses that could not be placed in the document text
    pub fn rejected(&self) -> &[AnnotateError] {
        &self.review.annotation.rejected
    }

    /// Findings list, risky clauses first
    pub fn review_order(&self) -> Vec<&Clause> {
        review_order(&self.result.clauses)
    }

    pub fn selected_clause(&self) -> Option<&Clause> {
        self.selected_clause.and_then(|id| self.result.clause(id))
    }

    /// Focus a clause. Unknown ids clear the selection.
    pub fn select_clause(&mut self, id: u32) -> Option<&Clause> {
        self.selected_clause = self.result.clause(id).map(|c| c.id);
        self.selected_clause()
    }
}

/// An in-flight analysis request. Running it calls the backend once.
pub struct Submission {
    seq: u64,
    request: BoxFuture<'static, Result<AnalysisResult, AnalysisFailure>>,
}

impl std::fmt::Debug for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submission").field("seq", &self.seq).finish()
    }
}

impl Submission {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub async fn run(self) -> Completion {
        Completion {
            seq: self.seq,
            outcome: self.request.await,
        }
    }
}

/// Backend outcome tagged with the request it answers
#[derive(Debug, Clone)]
pub struct Completion {
    pub seq: u64,
    pub outcome: Result<AnalysisResult, AnalysisFailure>,
}

/// Whether a completion changed the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Applied,
    Stale,
}

pub struct AnalysisViewController {
    backend: Arc<dyn AnalysisBackend>,
    registry: RecentDocumentsRegistry,
    engine: RiskEngine,
    formats: AcceptedFormats,
    state: ViewState,
    error: Option<AnalysisFailure>,
    last_seq: u64,
}

impl AnalysisViewController {
    pub fn new(backend: Arc<dyn AnalysisBackend>, registry: RecentDocumentsRegistry) -> Self {
        Self {
            backend,
            registry,
            engine: RiskEngine::default(),
            formats: AcceptedFormats::default(),
            state: ViewState::Idle,
            error: None,
            last_seq: 0,
        }
    }

    /// Build a controller with scoring, formats and registry from `config`
    pub fn from_config(
        backend: Arc<dyn AnalysisBackend>,
        store: Arc<dyn KeyValueStore>,
        config: &LexiscanConfig,
    ) -> Self {
        let registry = RecentDocumentsRegistry::load_with_key(
            store,
            &config.registry.key,
            config.registry.capacity,
        );
        Self::new(backend, registry)
            .with_engine(RiskEngine::new(config.scoring.clone()))
            .with_formats(config.accepted_formats())
    }

    pub fn with_engine(mut self, engine: RiskEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_formats(mut self, formats: AcceptedFormats) -> Self {
        self.formats = formats;
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// The file chosen for (or under) analysis
    pub fn selected_file(&self) -> Option<&DocumentFile> {
        match &self.state {
            ViewState::Ready { file } | ViewState::Analyzing { file, .. } => Some(file),
            _ => None,
        }
    }

    pub fn view(&self) -> Option<&AnalysisView> {
        match &self.state {
            ViewState::Results(view) => Some(&**view),
            _ => None,
        }
    }

    /// Last analysis failure, cleared by the next selection or reset
    pub fn error(&self) -> Option<&AnalysisFailure> {
        self.error.as_ref()
    }

    pub fn registry(&self) -> &RecentDocumentsRegistry {
        &self.registry
    }

    pub fn select_file(&mut self, file: DocumentFile) -> Result<(), SessionError> {
        if let ViewState::Analyzing { .. } = self.state {
            return Err(SessionError::Busy);
        }
        if !self.formats.accepts(&file.media_type) {
            debug!(name = %file.name, media_type = %file.media_type, "Rejected file selection");
            return Err(SessionError::UnsupportedFormat {
                name: file.name,
                media_type: file.media_type,
            });
        }

        debug!(name = %file.name, "File selected");
        self.error = None;
        self.state = ViewState::Ready { file };
        Ok(())
    }

    /// Start analyzing the selected file.
    ///
    /// Returns `None` unless a file is selected and no request is in flight.
    pub fn submit(&mut self) -> Option<Submission> {
        let file = match std::mem::replace(&mut self.state, ViewState::Idle) {
            ViewState::Ready { file } => file,
            other => {
                debug!(phase = ?other.phase(), "Ignoring submit");
                self.state = other;
                return None;
            }
        };

        self.last_seq += 1;
        let seq = self.last_seq;
        let backend = Arc::clone(&self.backend);
        let document = file.clone();
        let request = async move { backend.submit_document(&document).await }.boxed();

        info!(name = %file.name, seq, "Submitting document for analysis");
        self.state = ViewState::Analyzing { file, seq };
        Some(Submission { seq, request })
    }

    /// Deliver a finished submission
    pub fn complete(&mut self, completion: Completion) -> Delivery {
        match completion.outcome {
            Ok(result) => self.on_success(completion.seq, result),
            Err(failure) => self.on_failure(completion.seq, failure),
        }
    }

    pub fn on_success(&mut self, seq: u64, result: AnalysisResult) -> Delivery {
        let Some(file) = self.take_in_flight(seq) else {
            warn!(seq, "Discarding stale analysis result");
            return Delivery::Stale;
        };

        if let Some(id) = result.duplicate_clause_id() {
            let failure = AnalysisFailure::malformed(format!(
                "Analysis of {} returned clause id {} more than once",
                file.name, id
            ));
            warn!(seq, "{}", failure);
            self.error = Some(failure);
            return Delivery::Applied;
        }

        let result = resolve_document(result, &file);
        let review = self.engine.review(&result);

        if let Err(e) = self.registry.record(&result.filename) {
            warn!(filename = %result.filename, "Recent documents not saved: {}", e);
        }

        info!(
            filename = %result.filename,
            clauses = result.clauses.len(),
            score = review.score.value,
            band = %review.score.band,
            "Analysis complete"
        );
        self.error = None;
        self.state = ViewState::Results(Box::new(AnalysisView {
            result,
            review,
            selected_clause: None,
        }));
        Delivery::Applied
    }

    pub fn on_failure(&mut self, seq: u64, failure: AnalysisFailure) -> Delivery {
        let Some(file) = self.take_in_flight(seq) else {
            warn!(seq, "Discarding stale analysis failure");
            return Delivery::Stale;
        };

        warn!(name = %file.name, code = %failure.code, "Analysis failed: {}", failure);
        self.error = Some(failure);
        Delivery::Applied
    }

    /// Abandon the in-flight request. Its completion will be stale.
    pub fn cancel(&mut self) -> bool {
        match self.take_in_flight(self.last_seq) {
            Some(file) => {
                debug!(name = %file.name, seq = self.last_seq, "Analysis cancelled");
                true
            }
            None => false,
        }
    }

    /// Return to `Idle`, dropping selection, results and error
    pub fn reset(&mut self) {
        if self.phase() != Phase::Idle {
            debug!(phase = ?self.phase(), "Resetting view");
        }
        self.state = ViewState::Idle;
        self.error = None;
    }

    /// Focus a clause in the results view
    pub fn select_clause(&mut self, id: u32) -> Option<&Clause> {
        match &mut self.state {
            ViewState::Results(view) => view.select_clause(id),
            _ => None,
        }
    }

    /// Select, submit and await one document
    pub async fn analyze(&mut self, file: DocumentFile) -> Result<&AnalysisView, SessionError> {
        self.select_file(file)?;
        let submission = self.submit().ok_or(SessionError::Busy)?;
        let completion = submission.run().await;
        self.complete(completion);

        match &self.state {
            ViewState::Results(view) => Ok(&**view),
            _ => Err(self
                .error
                .clone()
                .map(SessionError::Analysis)
                .unwrap_or(SessionError::NoResult)),
        }
    }

    /// Leave `Analyzing` if `seq` is the in-flight request
    fn take_in_flight(&mut self, seq: u64) -> Option<DocumentFile> {
        match &self.state {
            ViewState::Analyzing { seq: current, .. } if *current == seq => {}
            _ => return None,
        }
        match std::mem::replace(&mut self.state, ViewState::Idle) {
            ViewState::Analyzing { file, .. } => Some(file),
            other => {
                self.state = other;
                None
            }
        }
    }
}

/// Fill in what the backend left out so the result can be displayed
fn resolve_document(mut result: AnalysisResult, file: &DocumentFile) -> AnalysisResult {
    if result.filename.is_empty() {
        result.filename = file.name.clone();
    }
    if !result.document_text.is_empty() {
        return result;
    }

    if file.is_text() {
        debug!(name = %file.name, "Using uploaded text as document text");
        result.document_text = file.text().into_owned();
    } else if !result.clauses.is_empty() {
        debug!(name = %file.name, "Rebuilding document text from clauses");
        let (text, clauses) = reconstruct_document(&result.clauses);
        result.document_text = text;
        result.clauses = clauses;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MALFORMED_RESPONSE, MEDIA_TYPE_PDF, MEDIA_TYPE_TEXT};
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use shared_types::{ClauseAnalysis, RiskLevel};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LEASE: &str = "A. Tenant pays rent. B. Landlord may enter anytime.";

    struct ScriptedBackend {
        calls: AtomicUsize,
        response: Result<AnalysisResult, AnalysisFailure>,
    }

    impl ScriptedBackend {
        fn answering(response: Result<AnalysisResult, AnalysisFailure>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                response,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalysisBackend for ScriptedBackend {
        async fn submit_document(
            &self,
            _file: &DocumentFile,
        ) -> Result<AnalysisResult, AnalysisFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn persist(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn retrieve(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
    }

    fn analysis(risk_level: RiskLevel) -> Option<ClauseAnalysis> {
        Some(ClauseAnalysis {
            risk_level,
            score: 0.0,
            legal_reference: String::new(),
            explanation: String::new(),
            recommendation: None,
        })
    }

    fn lease_result() -> AnalysisResult {
        AnalysisResult {
            filename: "bail.txt".to_string(),
            document_text: LEASE.to_string(),
            clauses: vec![
                Clause {
                    id: 1,
                    text: "A. Tenant pays rent.".to_string(),
                    start_index: 0,
                    end_index: 20,
                    analysis: analysis(RiskLevel::Low),
                },
                Clause {
                    id: 2,
                    text: "B. Landlord may enter".to_string(),
                    start_index: 21,
                    end_index: 42,
                    analysis: analysis(RiskLevel::Critical),
                },
            ],
            risk_score_global: None,
            summary: None,
        }
    }

    fn text_file(name: &str) -> DocumentFile {
        DocumentFile::new(name, MEDIA_TYPE_TEXT, LEASE.as_bytes().to_vec())
    }

    fn controller(backend: Arc<ScriptedBackend>) -> AnalysisViewController {
        let registry = RecentDocumentsRegistry::load(Arc::new(MemoryStore::new()), 10);
        AnalysisViewController::new(backend, registry)
    }

    #[tokio::test]
    async fn test_analyze_shows_results_and_records_file() {
        let backend = ScriptedBackend::answering(Ok(lease_result()));
        let mut controller = controller(backend.clone());

        let view = controller.analyze(text_file("bail.txt")).await.unwrap();
        assert_eq!(view.segments().len(), 3);
        assert_eq!(view.score().value, 75.0);
        assert_eq!(view.score().band, RiskLevel::Critical);
        assert_eq!(view.review_order()[0].id, 2);

        assert_eq!(controller.phase(), Phase::Results);
        assert!(controller.registry().contains("bail.txt"));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_double_submit_calls_backend_once() {
        let backend = ScriptedBackend::answering(Ok(lease_result()));
        let mut controller = controller(backend.clone());

        controller.select_file(text_file("bail.txt")).unwrap();
        let submission = controller.submit().unwrap();
        assert!(controller.submit().is_none());
        assert_eq!(controller.phase(), Phase::Analyzing);

        let delivery = controller.complete(submission.run().await);
        assert_eq!(delivery, Delivery::Applied);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_request_is_stale() {
        let backend = ScriptedBackend::answering(Ok(lease_result()));
        let mut controller = controller(backend.clone());

        controller.select_file(text_file("old.txt")).unwrap();
        let first = controller.submit().unwrap();
        assert!(controller.cancel());
        assert_eq!(controller.phase(), Phase::Idle);

        controller.select_file(text_file("new.txt")).unwrap();
        let second = controller.submit().unwrap();
        assert!(second.seq() > first.seq());

        assert_eq!(controller.complete(first.run().await), Delivery::Stale);
        assert_eq!(controller.phase(), Phase::Analyzing);
        assert_eq!(controller.selected_file().unwrap().name, "new.txt");

        assert_eq!(controller.complete(second.run().await), Delivery::Applied);
        assert_eq!(controller.phase(), Phase::Results);
        assert_eq!(controller.registry().len(), 1);
        assert!(controller.registry().contains("bail.txt"));
    }

    #[tokio::test]
    async fn test_reset_while_analyzing_retires_request() {
        let backend = ScriptedBackend::answering(Ok(lease_result()));
        let mut controller = controller(backend.clone());

        controller.select_file(text_file("bail.txt")).unwrap();
        let first = controller.submit().unwrap();
        controller.reset();
        assert_eq!(controller.phase(), Phase::Idle);

        assert_eq!(controller.complete(first.run().await), Delivery::Stale);
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.view().is_none());
        assert!(controller.registry().is_empty());
    }

    #[tokio::test]
    async fn test_registry_records_backend_filename() {
        let mut result = lease_result();
        result.filename = "Bail_Commercial_75011.pdf".to_string();
        let mut controller = controller(ScriptedBackend::answering(Ok(result)));

        controller.analyze(text_file("upload-123.txt")).await.unwrap();
        let recorded: Vec<&str> = controller
            .registry()
            .list()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(recorded, vec!["Bail_Commercial_75011.pdf"]);
    }

    #[test]
    fn test_result_without_request_is_stale() {
        let mut controller = controller(ScriptedBackend::answering(Ok(lease_result())));
        assert_eq!(controller.on_success(1, lease_result()), Delivery::Stale);
        assert_eq!(
            controller.on_failure(1, AnalysisFailure::transport("late")),
            Delivery::Stale
        );
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.error().is_none());
        assert!(!controller.cancel());
    }

    #[tokio::test]
    async fn test_failure_returns_to_idle_without_recording() {
        let failure = AnalysisFailure::new("400", "Unsupported file type. Use PDF or Text.");
        let backend = ScriptedBackend::answering(Err(failure.clone()));
        let mut controller = controller(backend);

        let err = controller.analyze(text_file("bail.txt")).await.unwrap_err();
        assert!(matches!(err, SessionError::Analysis(ref f) if *f == failure));
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.selected_file().is_none());
        assert_eq!(controller.error(), Some(&failure));
        assert!(controller.registry().is_empty());
    }

    #[test]
    fn test_unsupported_format_leaves_state_unchanged() {
        let backend = ScriptedBackend::answering(Ok(lease_result()));
        let mut controller = controller(backend.clone());

        let image = DocumentFile::new("scan.jpg", "image/jpeg", vec![0xff, 0xd8]);
        let err = controller.select_file(image.clone()).unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedFormat { .. }));
        assert_eq!(controller.phase(), Phase::Idle);

        controller.select_file(text_file("bail.txt")).unwrap();
        assert!(controller.select_file(image).is_err());
        assert_eq!(controller.selected_file().unwrap().name, "bail.txt");
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_select_while_analyzing_is_busy() {
        let mut controller = controller(ScriptedBackend::answering(Ok(lease_result())));
        controller.select_file(text_file("a.txt")).unwrap();
        let _submission = controller.submit().unwrap();

        let err = controller.select_file(text_file("b.txt")).unwrap_err();
        assert!(matches!(err, SessionError::Busy));
        assert_eq!(controller.selected_file().unwrap().name, "a.txt");
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let mut controller = controller(ScriptedBackend::answering(Ok(lease_result())));
        controller.reset();
        assert_eq!(controller.phase(), Phase::Idle);

        controller.analyze(text_file("bail.txt")).await.unwrap();
        controller.reset();
        controller.reset();
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.view().is_none());
        assert!(controller.registry().contains("bail.txt"));
    }

    #[tokio::test]
    async fn test_registry_write_failure_is_not_fatal() {
        let backend = ScriptedBackend::answering(Ok(lease_result()));
        let registry = RecentDocumentsRegistry::load(Arc::new(ReadOnlyStore), 10);
        let mut controller = AnalysisViewController::new(backend, registry);

        controller.analyze(text_file("bail.txt")).await.unwrap();
        assert_eq!(controller.phase(), Phase::Results);
        assert!(controller.registry().contains("bail.txt"));
    }

    #[tokio::test]
    async fn test_duplicate_clause_ids_are_malformed() {
        let mut result = lease_result();
        result.clauses[1].id = 1;
        let mut controller = controller(ScriptedBackend::answering(Ok(result)));

        let err = controller.analyze(text_file("bail.txt")).await.unwrap_err();
        assert!(matches!(err, SessionError::Analysis(ref f) if f.code == MALFORMED_RESPONSE));
        assert_eq!(controller.phase(), Phase::Idle);
        assert!(controller.registry().is_empty());
    }

    #[tokio::test]
    async fn test_text_upload_supplies_missing_document_text() {
        let mut result = lease_result();
        result.document_text.clear();
        result.filename.clear();
        let mut controller = controller(ScriptedBackend::answering(Ok(result)));

        let view = controller.analyze(text_file("bail.txt")).await.unwrap();
        assert_eq!(view.result.document_text, LEASE);
        assert_eq!(view.result.filename, "bail.txt");
        assert_eq!(view.review.annotation.text(), LEASE);
    }

    #[tokio::test]
    async fn test_pdf_without_text_is_rebuilt_from_clauses() {
        let mut result = lease_result();
        result.document_text.clear();
        let mut controller = controller(ScriptedBackend::answering(Ok(result)));

        let pdf = DocumentFile::new("bail.pdf", MEDIA_TYPE_PDF, b"%PDF-1.7".to_vec());
        let view = controller.analyze(pdf).await.unwrap();
        assert_eq!(
            view.result.document_text,
            "A. Tenant pays rent.\n\nB. Landlord may enter"
        );
        assert!(view.rejected().is_empty());
        assert_eq!(view.segments().len(), 3);
    }

    #[tokio::test]
    async fn test_select_clause() {
        let mut controller = controller(ScriptedBackend::answering(Ok(lease_result())));
        assert!(controller.select_clause(2).is_none());

        controller.analyze(text_file("bail.txt")).await.unwrap();
        assert_eq!(controller.select_clause(2).map(|c| c.id), Some(2));
        assert_eq!(
            controller.view().unwrap().selected_clause().map(|c| c.id),
            Some(2)
        );
        assert!(controller.select_clause(99).is_none());
        assert!(controller.view().unwrap().selected_clause().is_none());
    }

    #[tokio::test]
    async fn test_config_thresholds_apply() {
        let config = LexiscanConfig::from_str("[scoring]\ncritical_above = 80.0").unwrap();
        let mut controller = AnalysisViewController::from_config(
            ScriptedBackend::answering(Ok(lease_result())),
            Arc::new(MemoryStore::new()),
            &config,
        );

        let view = controller.analyze(text_file("bail.txt")).await.unwrap();
        assert_eq!(view.score().value, 75.0);
        assert_eq!(view.score().band, RiskLevel::Moderate);
    }
}
