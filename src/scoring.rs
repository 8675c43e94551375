//! Priority/ROI scoring.
//!
//! Five independently normalized sub-scores are combined through
//! caller-configurable weights into a 0–100 composite. The scorer never
//! mutates an estimate: it produces a separate [`ScoredEstimate`], so
//! re-running a scorer over the same inputs is aliasing-free.

use serde::{Deserialize, Serialize};

use crate::cost::CostEstimate;
use crate::error::{ReforgeError, Result};
use crate::pattern::Severity;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Log base-10 denominator anchoring ROI normalization: 100% → ≈0.5.
const ROI_LOG_DENOM: f64 = 4.0;
/// Log base-10 denominator anchoring savings normalization: $1M → ≈0.83.
const SAVINGS_LOG_DENOM: f64 = 7.2;
/// Decay rate so a 30-day payback scores ≈0.9.
const PAYBACK_DECAY: f64 = 0.0035;
/// Decay rate so a $1K implementation cost scores ≈0.9.
const COST_DECAY: f64 = 1.05e-4;

/// Priority bucket derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriorityTier {
    Low,
    Medium,
    High,
}

impl PriorityTier {
    /// Tier for a composite score.
    pub fn for_score(score: f64) -> Self {
        if score >= 70.0 {
            PriorityTier::High
        } else if score >= 40.0 {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        }
    }
}

impl std::fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriorityTier::High => write!(f, "HIGH"),
            PriorityTier::Medium => write!(f, "MEDIUM"),
            PriorityTier::Low => write!(f, "LOW"),
        }
    }
}

/// Weights for the five sub-scores. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub roi: f64,
    pub savings: f64,
    pub payback: f64,
    pub implementation_cost: f64,
    pub severity: f64,
}

impl ScoringWeights {
    /// Create validated weights; fails unless they sum to 1.0 within
    /// floating tolerance.
    pub fn new(
        roi: f64,
        savings: f64,
        payback: f64,
        implementation_cost: f64,
        severity: f64,
    ) -> Result<Self> {
        let sum = roi + savings + payback + implementation_cost + severity;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE || sum.is_nan() {
            return Err(ReforgeError::config(format!(
                "scoring weights must sum to 1.0, got {}",
                sum
            )));
        }
        if [roi, savings, payback, implementation_cost, severity]
            .iter()
            .any(|w| *w < 0.0)
        {
            return Err(ReforgeError::config("scoring weights must be non-negative"));
        }
        Ok(Self {
            roi,
            savings,
            payback,
            implementation_cost,
            severity,
        })
    }

    /// Default profile: value and speed weighted evenly.
    pub fn balanced() -> Self {
        Self {
            roi: 0.25,
            savings: 0.25,
            payback: 0.20,
            implementation_cost: 0.15,
            severity: 0.15,
        }
    }

    /// Quick-win profile: favors short payback and cheap changes.
    pub fn aggressive() -> Self {
        Self {
            roi: 0.15,
            savings: 0.10,
            payback: 0.35,
            implementation_cost: 0.30,
            severity: 0.10,
        }
    }

    /// High-value profile: favors ROI and absolute savings.
    pub fn conservative() -> Self {
        Self {
            roi: 0.35,
            savings: 0.35,
            payback: 0.10,
            implementation_cost: 0.10,
            severity: 0.10,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::balanced()
    }
}

/// A cost estimate enriched with its priority score and tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredEstimate {
    /// The underlying immutable estimate
    pub estimate: CostEstimate,
    /// Severity of the source pattern
    pub severity: Severity,
    /// Composite priority score in [0,100]
    pub priority_score: f64,
    /// Tier bucket for the score
    pub priority_tier: PriorityTier,
}

/// Computes composite priority scores and rankings.
#[derive(Debug, Clone, Default)]
pub struct PriorityScorer {
    weights: ScoringWeights,
}

impl PriorityScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Score one estimate.
    pub fn score(&self, estimate: CostEstimate, severity: Severity) -> ScoredEstimate {
        let w = &self.weights;
        let composite = (w.roi * roi_score(estimate.roi_percentage)
            + w.savings * savings_score(estimate.annual_savings)
            + w.payback * payback_score(estimate.payback_days)
            + w.implementation_cost * cost_score(estimate.implementation_cost)
            + w.severity * severity_score(severity))
            * 100.0;
        let priority_score = composite.clamp(0.0, 100.0);
        ScoredEstimate {
            estimate,
            severity,
            priority_score,
            priority_tier: PriorityTier::for_score(priority_score),
        }
    }

    /// Score and rank a collection: priority score descending, ties broken
    /// by annual savings descending. The sort is stable, so ranking an
    /// already-ranked list reproduces the same order.
    pub fn rank(&self, estimates: Vec<(CostEstimate, Severity)>) -> Vec<ScoredEstimate> {
        let mut scored: Vec<ScoredEstimate> = estimates
            .into_iter()
            .map(|(estimate, severity)| self.score(estimate, severity))
            .collect();
        scored.sort_by(|a, b| {
            b.priority_score
                .total_cmp(&a.priority_score)
                .then(b.estimate.annual_savings.total_cmp(&a.estimate.annual_savings))
        });
        scored
    }
}

/// Logarithmic ROI normalization, clamped to [0,1]; non-positive → 0.
fn roi_score(roi_percentage: f64) -> f64 {
    if roi_percentage <= 0.0 || roi_percentage.is_nan() {
        return 0.0;
    }
    ((1.0 + roi_percentage).log10() / ROI_LOG_DENOM).clamp(0.0, 1.0)
}

/// Logarithmic savings normalization, clamped to [0,1]; non-positive → 0.
fn savings_score(annual_savings: f64) -> f64 {
    if annual_savings <= 0.0 || annual_savings.is_nan() {
        return 0.0;
    }
    ((1.0 + annual_savings).log10() / SAVINGS_LOG_DENOM).clamp(0.0, 1.0)
}

/// Exponential payback normalization: shorter payback → closer to 1.
fn payback_score(payback_days: Option<f64>) -> f64 {
    match payback_days {
        Some(days) if days >= 0.0 => (-PAYBACK_DECAY * days).exp(),
        _ => 0.0,
    }
}

/// Exponential implementation-cost normalization: cheaper → closer to 1.
fn cost_score(implementation_cost: f64) -> f64 {
    if implementation_cost < 0.0 || implementation_cost.is_nan() {
        return 0.0;
    }
    (-COST_DECAY * implementation_cost).exp()
}

fn severity_score(severity: Severity) -> f64 {
    match severity {
        Severity::High => 1.0,
        Severity::Medium => 0.6,
        Severity::Low => 0.3,
    }
}
