//! Review session: the stateful side of contract review
//!
//! Ties the pure [`risk_engine`] to the outside world: the analysis backend,
//! durable storage for the recent documents list, and the view state
//! machine a host drives from user actions.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod registry;
pub mod store;

pub use backend::{AcceptedFormats, AnalysisBackend, AnalysisFailure, DocumentFile};
pub use config::LexiscanConfig;
pub use controller::{
    AnalysisView, AnalysisViewController, Completion, Delivery, Phase, Submission, ViewState,
};
pub use error::{SessionError, StoreError};
pub use registry::{RecentDocumentsRegistry, RecentEntry, RECENT_DOCUMENTS_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
