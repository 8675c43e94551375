//! Pairwise conflict detection across detected patterns.
//!
//! Two optimizations conflict only when they touch the same tables AND
//! their pattern types are declared mutually incompatible. Detection is
//! O(n²) over the estimate count, which is bounded by the number of
//! detected patterns per run.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::pattern::{DetectedPattern, PatternType};
use crate::scoring::ScoredEstimate;

/// Kind of conflict between two optimizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// The optimizations pull the shared tables in opposite directions
    Incompatible,
    /// Reserved: same objects, compatible directions
    Overlapping,
    /// Reserved: one optimization invalidates the other's inputs
    Cascading,
}

/// How a conflict should be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// A duality view reconciles the two access shapes structurally
    DualityView,
    /// Keep the first pattern, drop the second
    PrioritizeA,
    /// Keep the second pattern, drop the first
    PrioritizeB,
}

/// A conflict between an unordered pair of patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationConflict {
    /// First pattern id
    pub pattern_a: String,
    /// Second pattern id
    pub pattern_b: String,
    /// Conflict kind
    pub kind: ConflictKind,
    /// Objects both patterns touch
    pub overlapping_objects: Vec<String>,
    /// Selected resolution strategy
    pub resolution: Resolution,
}

impl OptimizationConflict {
    /// Whether this conflict involves the given pattern.
    pub fn involves(&self, pattern_id: &str) -> bool {
        self.pattern_a == pattern_id || self.pattern_b == pattern_id
    }
}

/// Pattern-type pairs that cannot both be applied to one table.
const INCOMPATIBLE: [(PatternType, PatternType); 2] = [
    (PatternType::DocumentCandidate, PatternType::ExpensiveJoin),
    (PatternType::LobCliff, PatternType::DocumentCandidate),
];

fn incompatible(a: PatternType, b: PatternType) -> bool {
    INCOMPATIBLE
        .iter()
        .any(|(x, y)| (a == *x && b == *y) || (a == *y && b == *x))
}

/// Detects conflicts over a full set of scored estimates.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn new() -> Self {
        Self
    }

    /// Pairwise detection. `patterns` supplies the affected-object sets for
    /// each estimate's pattern id; estimates without a matching pattern are
    /// ignored.
    pub fn detect(
        &self,
        patterns: &[DetectedPattern],
        scored: &[ScoredEstimate],
    ) -> Vec<OptimizationConflict> {
        let mut conflicts = Vec::new();
        for i in 0..scored.len() {
            for j in (i + 1)..scored.len() {
                if let Some(conflict) = self.check_pair(patterns, &scored[i], &scored[j]) {
                    conflicts.push(conflict);
                }
            }
        }
        conflicts
    }

    fn check_pair(
        &self,
        patterns: &[DetectedPattern],
        a: &ScoredEstimate,
        b: &ScoredEstimate,
    ) -> Option<OptimizationConflict> {
        if !incompatible(a.estimate.pattern_type, b.estimate.pattern_type) {
            return None;
        }
        let pattern_a = patterns.iter().find(|p| p.id == a.estimate.pattern_id)?;
        let pattern_b = patterns.iter().find(|p| p.id == b.estimate.pattern_id)?;

        let tables_a: BTreeSet<String> = pattern_a.affected_tables().into_iter().collect();
        let tables_b: BTreeSet<String> = pattern_b.affected_tables().into_iter().collect();
        let overlap: Vec<String> = tables_a.intersection(&tables_b).cloned().collect();
        if overlap.is_empty() {
            return None;
        }

        let resolution = self.resolve(a, b);
        Some(OptimizationConflict {
            pattern_a: a.estimate.pattern_id.clone(),
            pattern_b: b.estimate.pattern_id.clone(),
            kind: ConflictKind::Incompatible,
            overlapping_objects: overlap,
            resolution,
        })
    }

    fn resolve(&self, a: &ScoredEstimate, b: &ScoredEstimate) -> Resolution {
        // A document shape and a denormalized join are structurally
        // reconcilable through a duality view.
        let types = (a.estimate.pattern_type, b.estimate.pattern_type);
        if matches!(
            types,
            (PatternType::DocumentCandidate, PatternType::ExpensiveJoin)
                | (PatternType::ExpensiveJoin, PatternType::DocumentCandidate)
        ) {
            return Resolution::DualityView;
        }
        if a.priority_score > b.priority_score {
            Resolution::PrioritizeA
        } else {
            Resolution::PrioritizeB
        }
    }
}
