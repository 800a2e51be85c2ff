//! The analysis collaborator and the documents handed to it

use std::borrow::Cow;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::AnalysisResult;
use thiserror::Error;

pub const MEDIA_TYPE_PDF: &str = "application/pdf";
pub const MEDIA_TYPE_TEXT: &str = "text/plain";

/// The backend could not be reached or failed the request
pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
/// The backend answered with data that cannot be shown
pub const MALFORMED_RESPONSE: &str = "MALFORMED_RESPONSE";

/// A document chosen by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub name: String,
    /// Media type declared by the host (from the picker or the extension)
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn is_text(&self) -> bool {
        essence(&self.media_type).starts_with("text/")
    }

    /// Contents as text, replacing invalid UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Failure reported by the analysis collaborator. Shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct AnalysisFailure {
    pub code: String,
    pub message: String,
}

impl AnalysisFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(TRANSPORT_ERROR, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(MALFORMED_RESPONSE, message)
    }
}

/// Submits a document for analysis.
///
/// Timeouts and retries are the implementation's business; the session
/// calls this at most once per submission.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn submit_document(&self, file: &DocumentFile) -> Result<AnalysisResult, AnalysisFailure>;
}

/// Allow-list of declared media types accepted for analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedFormats {
    media_types: Vec<String>,
}

impl Default for AcceptedFormats {
    fn default() -> Self {
        Self::new([MEDIA_TYPE_PDF, MEDIA_TYPE_TEXT])
    }
}

impl AcceptedFormats {
    pub fn new<I, S>(media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            media_types: media_types
                .into_iter()
                .map(|m| essence(m.as_ref()))
                .collect(),
        }
    }

    /// Parameters such as `; charset=utf-8` are ignored, case is not significant
    pub fn accepts(&self, media_type: &str) -> bool {
        let wanted = essence(media_type);
        self.media_types.iter().any(|m| *m == wanted)
    }

    pub fn media_types(&self) -> &[String] {
        &self.media_types
    }
}

fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
