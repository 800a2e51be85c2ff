//! Terminal and JSON output

use std::io::{self, Write};

use review_session::{AnalysisView, RecentEntry};
use risk_engine::{DocumentReview, ScoreSource, Segment};
use serde::Serialize;
use shared_types::{AnalysisResult, RiskLevel};

fn marker(risk_level: Option<RiskLevel>) -> &'static str {
    match risk_level {
        Some(RiskLevel::Critical) => "!!",
        Some(RiskLevel::Moderate) => "!",
        Some(RiskLevel::Low) => "ok",
        None => "?",
    }
}

/// Document with flagged clauses bracketed, then the score and findings
pub fn write_view<W: Write>(out: &mut W, view: &AnalysisView) -> io::Result<()> {
    writeln!(out, "== {} ==", view.result.filename)?;
    if let Some(summary) = &view.result.summary {
        writeln!(out, "{}", summary)?;
    }
    writeln!(out)?;

    for segment in view.segments() {
        match segment {
            Segment::Plain { text, .. } => write!(out, "{}", text)?,
            Segment::Clause {
                clause_id,
                text,
                risk_level,
                ..
            } => write!(out, "[#{} {}| {}]", clause_id, marker(*risk_level), text)?,
        }
    }
    writeln!(out)?;
    writeln!(out)?;

    let score = view.score();
    let source = match score.source {
        ScoreSource::Backend => "reported by analyzer",
        ScoreSource::Deduction => "computed from findings",
        ScoreSource::NoFindings => "no findings",
    };
    writeln!(out, "Risk score: {:.0}/100 ({}, {})", score.value, score.band, source)?;

    let counts = view.counts();
    writeln!(
        out,
        "Findings: {} critical, {} moderate, {} low, {} unscored",
        counts.critical, counts.moderate, counts.low, counts.unscored
    )?;

    for clause in view.review_order() {
        writeln!(out)?;
        let level = clause
            .risk_level()
            .map_or("Unscored", |r| r.as_str());
        writeln!(out, "#{} [{}] {}", clause.id, level, clause.text)?;
        if let Some(analysis) = &clause.analysis {
            if !analysis.legal_reference.is_empty() {
                writeln!(out, "   Reference: {}", analysis.legal_reference)?;
            }
            if !analysis.explanation.is_empty() {
                writeln!(out, "   {}", analysis.explanation)?;
            }
            if let Some(recommendation) = &analysis.recommendation {
                writeln!(out, "   Advice: {}", recommendation)?;
            }
        }
    }

    for rejected in view.rejected() {
        writeln!(out, "warning: {}", rejected)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonView<'a> {
    result: &'a AnalysisResult,
    review: &'a DocumentReview,
    review_order: Vec<u32>,
}

pub fn view_json(view: &AnalysisView) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonView {
        result: &view.result,
        review: &view.review,
        review_order: view.review_order().iter().map(|c| c.id).collect(),
    })
}

pub fn write_recent<'a, W: Write>(
    out: &mut W,
    entries: impl Iterator<Item = &'a RecentEntry>,
) -> io::Result<()> {
    let mut empty = true;
    for entry in entries {
        empty = false;
        writeln!(out, "{}  {}", entry.timestamp.format("%Y-%m-%d %H:%M"), entry.name)?;
    }
    if empty {
        writeln!(out, "No recent documents")?;
    }
    Ok(())
}
