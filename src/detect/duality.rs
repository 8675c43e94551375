//! Duality view opportunity detection: tables serving both OLTP and
//! analytics traffic from one underlying store.

use crate::detect::PatternDetector;
use crate::error::Result;
use crate::pattern::{DetectedPattern, PatternType, Severity};
use crate::schema::SchemaMetadata;
use crate::workload::{AnalysisWindow, QueryKind, WorkloadFeatures};

/// Thresholds for duality-view qualification.
#[derive(Debug, Clone)]
pub struct DualityThresholds {
    /// Minimum OLTP share of a table's executions, percent
    pub min_oltp_pct: f64,
    /// Minimum analytics share of a table's executions, percent
    pub min_analytics_pct: f64,
    /// Duality score at or above which severity is HIGH
    pub high_score: f64,
    /// Duality score at or above which severity is MEDIUM
    pub medium_score: f64,
}

impl Default for DualityThresholds {
    fn default() -> Self {
        Self {
            min_oltp_pct: 20.0,
            min_analytics_pct: 20.0,
            high_score: 0.30,
            medium_score: 0.15,
        }
    }
}

/// Finds tables whose traffic is split between point operations and
/// analytic scans, where a duality view can serve both shapes.
#[derive(Debug, Clone, Default)]
pub struct DualityViewFinder {
    thresholds: DualityThresholds,
}

impl DualityViewFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: DualityThresholds) -> Self {
        Self { thresholds }
    }
}

impl PatternDetector for DualityViewFinder {
    fn name(&self) -> &'static str {
        "duality_view"
    }

    fn detect(
        &self,
        schema: &SchemaMetadata,
        workload: &WorkloadFeatures,
        _window: AnalysisWindow,
    ) -> Result<Vec<DetectedPattern>> {
        let mut patterns = Vec::new();
        for table in schema.tables() {
            let mut oltp = 0.0_f64;
            let mut analytics = 0.0_f64;
            for pattern in workload.patterns_for_table(&table.table_name) {
                let executions = pattern.executions as f64;
                match pattern.kind {
                    QueryKind::Insert | QueryKind::Update | QueryKind::Delete => {
                        oltp += executions;
                    }
                    QueryKind::Select => {
                        if pattern.join_count > 0 || pattern.shape().has_aggregate {
                            analytics += executions;
                        } else {
                            oltp += executions;
                        }
                    }
                }
            }

            let total = oltp + analytics;
            if total == 0.0 {
                continue;
            }
            let oltp_pct = oltp / total * 100.0;
            let analytics_pct = analytics / total * 100.0;
            if oltp_pct < self.thresholds.min_oltp_pct
                || analytics_pct < self.thresholds.min_analytics_pct
            {
                continue;
            }

            let duality = oltp_pct.min(analytics_pct) / 100.0;
            let severity = if duality >= self.thresholds.high_score {
                Severity::High
            } else if duality >= self.thresholds.medium_score {
                Severity::Medium
            } else {
                Severity::Low
            };

            let description = format!(
                "Table {} serves {:.0}% OLTP and {:.0}% analytics traffic from the \
                 same rows",
                table.table_name, oltp_pct, analytics_pct
            );

            let pattern = DetectedPattern::new(
                PatternType::DualityViewOpportunity,
                severity,
                duality,
                vec![table.table_name.to_lowercase()],
                description,
            )?
            .with_metric("oltp_pct", oltp_pct)
            .with_metric("analytics_pct", analytics_pct)
            .with_metric("duality_score", duality)
            .with_hint(
                "Expose the table through a duality view so documents and rows share \
                 one store",
            );

            patterns.push(pattern);
        }
        Ok(patterns)
    }
}
