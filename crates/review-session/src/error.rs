//! Error types for the review session

use thiserror::Error;

use crate::backend::AnalysisFailure;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unsupported format for {name}: {media_type}")]
    UnsupportedFormat { name: String, media_type: String },

    #[error("An analysis is already in progress")]
    Busy,

    #[error(transparent)]
    Analysis(#[from] AnalysisFailure),

    #[error("Failed to save recent documents: {0}")]
    RegistryWrite(#[source] StoreError),

    #[error("No analysis result to show")]
    NoResult,
}
