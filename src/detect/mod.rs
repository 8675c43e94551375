//! Pattern detectors.
//!
//! Each detector is a pure function of (schema, workload, window) producing
//! `DetectedPattern` records; detectors share no mutable state and may run
//! in any order. The repeated compute-metrics → weighted-threshold →
//! classify-severity structure is factored into [`WeightedSignals`]; each
//! detector supplies only its own signal extractors and weight table.

mod duality;
mod join_dimension;
mod lob_cliff;
mod storage_model;

pub use duality::DualityViewFinder;
pub use join_dimension::JoinDimensionAnalyzer;
pub use lob_cliff::LobCliffDetector;
pub use storage_model::StorageModelClassifier;

use crate::error::Result;
use crate::pattern::DetectedPattern;
use crate::schema::SchemaMetadata;
use crate::workload::{AnalysisWindow, WorkloadFeatures};

/// A heuristic that inspects schema and workload for one anti-pattern
/// family.
pub trait PatternDetector {
    /// Detector name for logging and error attribution.
    fn name(&self) -> &'static str;

    /// Run the detection pass.
    fn detect(
        &self,
        schema: &SchemaMetadata,
        workload: &WorkloadFeatures,
        window: AnalysisWindow,
    ) -> Result<Vec<DetectedPattern>>;
}

/// A named binary contribution to a weighted risk score.
#[derive(Debug, Clone)]
pub struct Signal {
    /// Signal name, used in descriptions and metrics
    pub name: &'static str,
    /// Weight contributed when the signal fires
    pub weight: f64,
    /// Whether the condition held
    pub fired: bool,
}

/// Accumulator for weighted binary signals. Each signal contributes its
/// fixed weight only when its condition holds; the score is the sum of
/// fired weights.
#[derive(Debug, Clone, Default)]
pub struct WeightedSignals {
    signals: Vec<Signal>,
}

impl WeightedSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signal.
    pub fn add(&mut self, name: &'static str, weight: f64, fired: bool) -> &mut Self {
        self.signals.push(Signal {
            name,
            weight,
            fired,
        });
        self
    }

    /// Sum of fired weights.
    pub fn score(&self) -> f64 {
        self.signals
            .iter()
            .filter(|s| s.fired)
            .map(|s| s.weight)
            .sum()
    }

    /// Names of the signals that fired.
    pub fn fired(&self) -> Vec<&'static str> {
        self.signals
            .iter()
            .filter(|s| s.fired)
            .map(|s| s.name)
            .collect()
    }

    /// All recorded signals.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }
}
