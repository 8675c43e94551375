//! LOB cliff detection: frequent small writes to large out-of-line columns.

use crate::detect::{PatternDetector, WeightedSignals};
use crate::error::Result;
use crate::pattern::{DetectedPattern, PatternType, Severity};
use crate::schema::{SchemaMetadata, TableMetadata};
use crate::workload::{AnalysisWindow, QueryKind, WorkloadFeatures};

/// Tunable thresholds for LOB cliff detection.
#[derive(Debug, Clone)]
pub struct LobCliffThresholds {
    /// Average stored size above which the column lives out-of-line (bytes)
    pub out_of_line_bytes: f64,
    /// Daily update rate considered hot
    pub updates_per_day: f64,
    /// Update selectivity below which rewrites dominate the write cost
    pub selectivity: f64,
    /// Minimum risk score to emit a pattern
    pub min_risk: f64,
    /// Risk score at or above which severity is HIGH
    pub high_risk: f64,
}

impl Default for LobCliffThresholds {
    fn default() -> Self {
        Self {
            out_of_line_bytes: 4096.0,
            updates_per_day: 100.0,
            selectivity: 0.25,
            min_risk: 0.6,
            high_risk: 0.8,
        }
    }
}

const WEIGHT_SIZE: f64 = 0.3;
const WEIGHT_UPDATES: f64 = 0.3;
const WEIGHT_SELECTIVITY: f64 = 0.2;
const WEIGHT_ENCODING: f64 = 0.2;
const MAX_CONFIDENCE: f64 = 0.95;

/// Detects tables where a large text-encoded column is rewritten far more
/// often than its content actually changes.
#[derive(Debug, Clone, Default)]
pub struct LobCliffDetector {
    thresholds: LobCliffThresholds,
}

impl LobCliffDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: LobCliffThresholds) -> Self {
        Self { thresholds }
    }

    fn inspect_column(
        &self,
        table: &TableMetadata,
        column_name: &str,
        workload: &WorkloadFeatures,
        window: AnalysisWindow,
    ) -> Result<Option<DetectedPattern>> {
        let column = match table.column(column_name) {
            Some(c) => c,
            None => return Ok(None),
        };

        let updates: Vec<_> = workload
            .patterns_for_table(&table.table_name)
            .filter(|p| p.kind == QueryKind::Update)
            .collect();
        let update_executions: u64 = updates.iter().map(|p| p.executions).sum();
        let updates_per_day = window.per_day(update_executions as f64);

        let avg_update_latency = if update_executions > 0 {
            updates
                .iter()
                .map(|p| p.avg_latency_ms * p.executions as f64)
                .sum::<f64>()
                / update_executions as f64
        } else {
            0.0
        };
        let selectivity = estimate_update_selectivity(avg_update_latency);

        let mut signals = WeightedSignals::new();
        signals
            .add(
                "avg_size_above_out_of_line",
                WEIGHT_SIZE,
                column.avg_size_bytes > self.thresholds.out_of_line_bytes,
            )
            .add(
                "update_rate_hot",
                WEIGHT_UPDATES,
                updates_per_day > self.thresholds.updates_per_day,
            )
            .add(
                "low_update_selectivity",
                WEIGHT_SELECTIVITY,
                update_executions > 0 && selectivity < self.thresholds.selectivity,
            )
            .add("text_encoded_storage", WEIGHT_ENCODING, column.is_text_encoded());

        let risk = signals.score();
        if risk < self.thresholds.min_risk {
            return Ok(None);
        }

        let severity = if risk >= self.thresholds.high_risk {
            Severity::High
        } else {
            Severity::Medium
        };
        let confidence = risk.min(MAX_CONFIDENCE);
        let object = format!("{}.{}", table.table_name, column.name);

        let description = format!(
            "Column {} averages {:.1} KB per document and receives {:.0} updates/day \
             rewriting an estimated {:.0}% of each document; risk factors: {}",
            object,
            column.avg_size_bytes / 1024.0,
            updates_per_day,
            selectivity * 100.0,
            signals.fired().join(", ")
        );

        let pattern = DetectedPattern::new(
            PatternType::LobCliff,
            severity,
            confidence,
            vec![object],
            description,
        )?
        .with_metric("avg_size_kb", column.avg_size_bytes / 1024.0)
        .with_metric("updates_per_day", updates_per_day)
        .with_metric("update_selectivity", selectivity)
        .with_metric("avg_update_latency_ms", avg_update_latency)
        .with_metric("risk_score", risk)
        .with_metric("storage_encoding", if column.is_text_encoded() { "text" } else { "binary" })
        .with_hint(
            "Split the hot sub-document into its own table or convert the column \
             to binary-encoded storage to stop full-document rewrites",
        );

        Ok(Some(pattern))
    }
}

/// Infer the fraction of a document rewritten per update from the average
/// UPDATE latency. Faster statements imply smaller edits; the mapping is a
/// monotonic step function.
fn estimate_update_selectivity(avg_latency_ms: f64) -> f64 {
    if avg_latency_ms < 5.0 {
        0.05
    } else if avg_latency_ms < 20.0 {
        0.15
    } else if avg_latency_ms < 50.0 {
        0.30
    } else if avg_latency_ms < 200.0 {
        0.55
    } else {
        0.80
    }
}

impl PatternDetector for LobCliffDetector {
    fn name(&self) -> &'static str {
        "lob_cliff"
    }

    fn detect(
        &self,
        schema: &SchemaMetadata,
        workload: &WorkloadFeatures,
        window: AnalysisWindow,
    ) -> Result<Vec<DetectedPattern>> {
        let mut patterns = Vec::new();
        for table in schema.tables() {
            let lob_columns: Vec<String> =
                table.lob_columns().map(|c| c.name.clone()).collect();
            for column in lob_columns {
                if let Some(pattern) =
                    self.inspect_column(table, &column, workload, window)?
                {
                    patterns.push(pattern);
                }
            }
        }
        Ok(patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnMetadata;
    use crate::workload::QueryPattern;

    fn orders_with_clob(avg_size_bytes: f64) -> SchemaMetadata {
        let table = TableMetadata::new("app", "orders", 100_000, 600.0).with_columns(vec![
            ColumnMetadata::new("id", "NUMBER", false, 8.0),
            ColumnMetadata::new("payload", "CLOB", true, avg_size_bytes),
        ]);
        SchemaMetadata::new(vec![table]).unwrap()
    }

    fn update_workload(executions: u64, latency_ms: f64) -> WorkloadFeatures {
        WorkloadFeatures::new(vec![QueryPattern::new(
            "u1",
            "UPDATE orders SET payload = :1 WHERE id = :2",
            QueryKind::Update,
            executions,
            latency_ms,
            vec!["orders".into()],
        )])
    }

    #[test]
    fn test_hot_text_lob_is_high_severity() {
        let detector = LobCliffDetector::new();
        let patterns = detector
            .detect(
                &orders_with_clob(12_288.0),
                &update_workload(150, 3.0),
                AnalysisWindow::full_day(),
            )
            .unwrap();

        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.pattern_type, PatternType::LobCliff);
        assert_eq!(p.severity, Severity::High);
        assert!(p.confidence >= 0.8);
        assert_eq!(p.affected_objects, vec!["orders.payload".to_string()]);
    }

    #[test]
    fn test_sub_daily_window_normalizes_update_rate() {
        // 30 updates over 4 hours is 180/day, which should still fire the
        // update-rate signal.
        let detector = LobCliffDetector::new();
        let patterns = detector
            .detect(
                &orders_with_clob(12_288.0),
                &update_workload(30, 3.0),
                AnalysisWindow::hours(4.0),
            )
            .unwrap();
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].metric_f64("updates_per_day", 0.0) > 100.0);
    }

    #[test]
    fn test_cold_lob_not_reported() {
        // Small and rarely updated: only the selectivity and encoding
        // signals can fire (0.4 < 0.6).
        let detector = LobCliffDetector::new();
        let patterns = detector
            .detect(
                &orders_with_clob(1024.0),
                &update_workload(3, 3.0),
                AnalysisWindow::full_day(),
            )
            .unwrap();
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_slow_updates_imply_high_selectivity() {
        // Large and hot but slow updates (big rewrites are expected):
        // selectivity signal must not fire, leaving risk at 0.8 from the
        // other three signals.
        let detector = LobCliffDetector::new();
        let patterns = detector
            .detect(
                &orders_with_clob(12_288.0),
                &update_workload(150, 300.0),
                AnalysisWindow::full_day(),
            )
            .unwrap();
        assert_eq!(patterns.len(), 1);
        assert!((patterns[0].metric_f64("risk_score", 0.0) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_selectivity_step_is_monotonic() {
        let latencies = [1.0, 10.0, 30.0, 100.0, 500.0];
        let mut last = 0.0;
        for latency in latencies {
            let s = estimate_update_selectivity(latency);
            assert!(s >= last);
            last = s;
        }
    }
}
