//! Aggregate risk scoring
//!
//! A document score is either the backend's own global score or, when the
//! backend did not send one, a deduction from 100 per flagged clause. The
//! score is then classified into a [`RiskLevel`] band using configurable
//! thresholds.

use serde::{Deserialize, Serialize};
use shared_types::{AnalysisResult, Clause, RiskLevel};
use tracing::warn;

use crate::error::ScoringError;

pub const MAX_SCORE: f64 = 100.0;

/// Scores strictly above this are `Critical`
pub const DEFAULT_CRITICAL_ABOVE: f64 = 40.0;
/// Scores strictly above this (and not critical) are `Moderate`
pub const DEFAULT_MODERATE_ABOVE: f64 = 10.0;

pub const DEFAULT_CRITICAL_WEIGHT: u32 = 20;
pub const DEFAULT_MODERATE_WEIGHT: u32 = 10;
pub const DEFAULT_LOW_WEIGHT: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_critical_above")]
    pub critical_above: f64,
    #[serde(default = "default_moderate_above")]
    pub moderate_above: f64,
    #[serde(default)]
    pub weights: DeductionWeights,
}

fn default_critical_above() -> f64 {
    DEFAULT_CRITICAL_ABOVE
}

fn default_moderate_above() -> f64 {
    DEFAULT_MODERATE_ABOVE
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            critical_above: DEFAULT_CRITICAL_ABOVE,
            moderate_above: DEFAULT_MODERATE_ABOVE,
            weights: DeductionWeights::default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ScoringError> {
        for threshold in [self.critical_above, self.moderate_above] {
            if !(0.0..=MAX_SCORE).contains(&threshold) {
                return Err(ScoringError::ThresholdOutOfRange(threshold));
            }
        }
        if self.moderate_above > self.critical_above {
            return Err(ScoringError::InvertedThresholds {
                moderate_above: self.moderate_above,
                critical_above: self.critical_above,
            });
        }
        Ok(())
    }
}

/// Points deducted from 100 for each clause, by risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionWeights {
    #[serde(default = "default_critical_weight")]
    pub critical: u32,
    #[serde(default = "default_moderate_weight")]
    pub moderate: u32,
    #[serde(default = "default_low_weight")]
    pub low: u32,
}

fn default_critical_weight() -> u32 {
    DEFAULT_CRITICAL_WEIGHT
}

fn default_moderate_weight() -> u32 {
    DEFAULT_MODERATE_WEIGHT
}

fn default_low_weight() -> u32 {
    DEFAULT_LOW_WEIGHT
}

impl Default for DeductionWeights {
    fn default() -> Self {
        Self {
            critical: DEFAULT_CRITICAL_WEIGHT,
            moderate: DEFAULT_MODERATE_WEIGHT,
            low: DEFAULT_LOW_WEIGHT,
        }
    }
}

impl DeductionWeights {
    /// Unscored clauses count as low risk
    pub fn weight_for(&self, risk_level: Option<RiskLevel>) -> u32 {
        match risk_level {
            Some(RiskLevel::Critical) => self.critical,
            Some(RiskLevel::Moderate) => self.moderate,
            Some(RiskLevel::Low) | None => self.low,
        }
    }
}

/// Where a [`RiskScore`] value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Global score sent by the analysis backend
    Backend,
    /// Computed locally from clause risk levels
    Deduction,
    /// No clauses were flagged; the document is presumed conforming
    NoFindings,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub value: f64,
    pub band: RiskLevel,
    pub source: ScoreSource,
}

#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    config: ScoringConfig,
}

impl RiskScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn band_for(&self, value: f64) -> RiskLevel {
        if value > self.config.critical_above {
            RiskLevel::Critical
        } else if value > self.config.moderate_above {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    /// Deduction score over a clause set. Independent of clause order.
    pub fn score(&self, clauses: &[Clause]) -> RiskScore {
        if clauses.is_empty() {
            return RiskScore {
                value: 0.0,
                band: RiskLevel::Low,
                source: ScoreSource::NoFindings,
            };
        }

        let deducted: u64 = clauses
            .iter()
            .map(|c| u64::from(self.config.weights.weight_for(c.risk_level())))
            .sum();
        let value = (MAX_SCORE as u64).saturating_sub(deducted) as f64;

        RiskScore {
            value,
            band: self.band_for(value),
            source: ScoreSource::Deduction,
        }
    }

    /// Score a whole analysis, preferring the backend's global score
    pub fn score_document(&self, result: &AnalysisResult) -> RiskScore {
        match result.risk_score_global {
            Some(value) if value.is_finite() => {
                let value = value.clamp(0.0, MAX_SCORE);
                RiskScore {
                    value,
                    band: self.band_for(value),
                    source: ScoreSource::Backend,
                }
            }
            Some(value) => {
                warn!(
                    filename = %result.filename,
                    "Ignoring non-finite backend score {}, scoring clauses instead",
                    value
                );
                self.score(&result.clauses)
            }
            None => self.score(&result.clauses),
        }
    }
}
