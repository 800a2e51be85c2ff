//! Merges document text with clause spans into renderable segments
//!
//! Offsets are character offsets (Unicode scalar values), not byte offsets.
//! Overlapping clauses are clipped against the previous clause instead of
//! being rejected, so every clause that still covers unrendered text shows up.

use serde::Serialize;
use shared_types::{Clause, RiskLevel, Span};
use tracing::{debug, warn};

use crate::error::AnnotateError;

/// A contiguous piece of rendered output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Plain {
        text: String,
        span: Span,
    },
    Clause {
        clause_id: u32,
        text: String,
        span: Span,
        risk_level: Option<RiskLevel>,
    },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Plain { text, .. } | Segment::Clause { text, .. } => text,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Segment::Plain { span, .. } | Segment::Clause { span, .. } => *span,
        }
    }

    pub fn clause_id(&self) -> Option<u32> {
        match self {
            Segment::Clause { clause_id, .. } => Some(*clause_id),
            Segment::Plain { .. } => None,
        }
    }

    pub fn is_clause(&self) -> bool {
        matches!(self, Segment::Clause { .. })
    }
}

/// Ordered segments plus the clauses that could not be placed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub segments: Vec<Segment>,
    pub rejected: Vec<AnnotateError>,
}

impl Annotation {
    /// Concatenated segment text (equal to the annotated document)
    pub fn text(&self) -> String {
        self.segments.iter().map(Segment::text).collect()
    }

    pub fn clause_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.is_clause())
    }

    /// Segment rendering the given clause, if it survived clipping
    pub fn segment_for(&self, clause_id: u32) -> Option<&Segment> {
        self.segments
            .iter()
            .find(|s| s.clause_id() == Some(clause_id))
    }
}

/// Char-indexed view over a string
struct CharIndex<'a> {
    text: &'a str,
    // byte offset of every char, plus text.len() as the final entry
    offsets: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    fn new(text: &'a str) -> Self {
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Self { text, offsets }
    }

    fn char_len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn slice(&self, span: Span) -> &'a str {
        &self.text[self.offsets[span.start]..self.offsets[span.end]]
    }
}

/// Check a clause's offsets against a document of `len` characters
pub fn validate_span(clause: &Clause, len: usize) -> Result<(), AnnotateError> {
    if clause.start_index >= clause.end_index || clause.end_index > len {
        return Err(AnnotateError::InvalidSpan {
            clause_id: clause.id,
            start: clause.start_index,
            end: clause.end_index,
            len,
        });
    }
    Ok(())
}

/// Split `document_text` into plain and clause segments.
///
/// Concatenating the returned segments always reproduces `document_text`,
/// and no two clause segments overlap. Clauses with invalid offsets are
/// listed in [`Annotation::rejected`] and otherwise ignored.
pub fn annotate(document_text: &str, clauses: &[Clause]) -> Annotation {
    let index = CharIndex::new(document_text);
    let len = index.char_len();

    let mut sorted: Vec<&Clause> = clauses.iter().collect();
    sorted.sort_by_key(|c| (c.start_index, c.end_index));

    let mut annotation = Annotation::default();
    let mut cursor = 0;

    for clause in sorted {
        if let Err(err) = validate_span(clause, len) {
            warn!("Skipping clause: {}", err);
            annotation.rejected.push(err);
            continue;
        }

        if clause.start_index > cursor {
            let span = Span::new(cursor, clause.start_index);
            annotation.segments.push(Segment::Plain {
                text: index.slice(span).to_string(),
                span,
            });
        }

        let span = Span::new(clause.start_index.max(cursor), clause.end_index);
        if span.is_empty() {
            debug!(
                clause_id = clause.id,
                "Clause is covered by an earlier clause, nothing left to render"
            );
            continue;
        }
        if span.start != clause.start_index {
            debug!(
                clause_id = clause.id,
                from = clause.start_index,
                to = span.start,
                "Clipped overlapping clause"
            );
        }

        annotation.segments.push(Segment::Clause {
            clause_id: clause.id,
            text: index.slice(span).to_string(),
            span,
            risk_level: clause.risk_level(),
        });
        cursor = cursor.max(clause.end_index);
    }

    if cursor < len {
        let span = Span::new(cursor, len);
        annotation.segments.push(Segment::Plain {
            text: index.slice(span).to_string(),
            span,
        });
    }

    annotation
}
