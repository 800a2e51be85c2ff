//! Turning quotation-only findings into offset-bearing clauses
//!
//! Whole-document analyzers report each finding as an exact quotation of
//! the contract. The quotation rarely matches byte for byte: line breaks in
//! the extracted text become spaces, and quotes or a trailing ellipsis get
//! added around it. Matching therefore treats any run of whitespace as
//! equivalent and ignores case.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use shared_types::{Citation, Clause};
use tracing::debug;

/// Separator used when a document is rebuilt from its clause texts
pub const RECONSTRUCTION_SEPARATOR: &str = "\n\n";

lazy_static! {
    static ref LEADING_DECORATION: Regex = Regex::new(r#"^[\s"'«»“”]+"#).unwrap();
    static ref TRAILING_DECORATION: Regex =
        Regex::new(r#"(?:\.\.\.|…|[\s"'«»“”])+$"#).unwrap();
}

/// Strip surrounding quotes and a trailing ellipsis from a quotation
pub fn trim_quotation(text: &str) -> &str {
    let end = TRAILING_DECORATION
        .find(text)
        .map_or(text.len(), |m| m.start());
    let text = &text[..end];
    let start = LEADING_DECORATION.find(text).map_or(0, |m| m.end());
    &text[start..]
}

fn quotation_pattern(quotation: &str) -> Option<Regex> {
    let words: Vec<String> = quotation.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    RegexBuilder::new(&words.join(r"\s+"))
        .case_insensitive(true)
        .build()
        .ok()
}

fn char_offset(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].chars().count()
}

/// Locate each citation in `document_text` and build clauses for them.
///
/// Clause ids are assigned sequentially from 1 in citation order. A citation
/// repeated verbatim is matched against the next occurrence after the
/// previous match, falling back to the first occurrence. Citations that
/// cannot be found are dropped.
pub fn locate_citations(document_text: &str, citations: &[Citation]) -> Vec<Clause> {
    let mut clauses = Vec::with_capacity(citations.len());
    let mut resume_at: HashMap<String, usize> = HashMap::new();

    for citation in citations {
        let quotation = trim_quotation(&citation.text);
        let Some(pattern) = quotation_pattern(quotation) else {
            debug!("Skipping empty citation");
            continue;
        };

        let key = pattern.as_str().to_string();
        let from = resume_at.get(&key).copied().unwrap_or(0);
        let found = pattern
            .find_at(document_text, from)
            .or_else(|| pattern.find(document_text));

        let Some(m) = found else {
            debug!(citation = %quotation, "Citation not found in document text");
            continue;
        };
        resume_at.insert(key, m.end());

        let start_index = char_offset(document_text, m.start());
        let end_index = start_index + m.as_str().chars().count();
        clauses.push(Clause {
            id: clauses.len() as u32 + 1,
            text: m.as_str().to_string(),
            start_index,
            end_index,
            analysis: Some(citation.to_analysis()),
        });
    }

    clauses
}

/// Rebuild a displayable document from clause texts.
///
/// Used when the original is not text-native (a PDF rendered separately)
/// and the backend returned no text: the clause texts are joined by a blank
/// line in result order, and offsets are rewritten to point into the
/// reconstruction.
pub fn reconstruct_document(clauses: &[Clause]) -> (String, Vec<Clause>) {
    let mut text = String::new();
    let mut cursor = 0;
    let mut rebuilt = Vec::with_capacity(clauses.len());

    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            text.push_str(RECONSTRUCTION_SEPARATOR);
            cursor += RECONSTRUCTION_SEPARATOR.chars().count();
        }
        let len = clause.text.chars().count();
        text.push_str(&clause.text);

        rebuilt.push(Clause {
            start_index: cursor,
            end_index: cursor + len,
            ..clause.clone()
        });
        cursor += len;
    }

    (text, rebuilt)
}

/// Join citation quotations into a document for [`locate_citations`]
pub fn reconstruct_from_citations(citations: &[Citation]) -> String {
    citations
        .iter()
        .map(|c| trim_quotation(&c.text))
        .filter(|q| !q.is_empty())
        .collect::<Vec<_>>()
        .join(RECONSTRUCTION_SEPARATOR)
}
