//! Document vs. relational storage-model classification.
//!
//! Scores each table's access profile on two axes and reports a candidate
//! only when one axis clearly dominates.

use crate::detect::PatternDetector;
use crate::error::Result;
use crate::pattern::{DetectedPattern, PatternType, Severity};
use crate::schema::{SchemaMetadata, TableMetadata};
use crate::workload::{AnalysisWindow, QueryKind, WorkloadFeatures};

/// Weights and thresholds for the storage-model scores.
#[derive(Debug, Clone)]
pub struct StorageModelWeights {
    /// Whole-row fetch fraction weight (document axis)
    pub whole_row: f64,
    /// Object-access proxy weight (document axis)
    pub object_access: f64,
    /// Schema-flexibility weight (document axis)
    pub flexibility: f64,
    /// Multi-column-update weight (document axis)
    pub multi_column_update: f64,
    /// Aggregate-query fraction weight (relational axis)
    pub aggregate: f64,
    /// Multi-table-join fraction weight (relational axis)
    pub multi_join: f64,
    /// Minimum |document − relational| gap to emit a pattern
    pub strong_signal: f64,
    /// Gap at or above which severity is HIGH
    pub high_signal: f64,
}

impl Default for StorageModelWeights {
    fn default() -> Self {
        Self {
            whole_row: 0.30,
            object_access: 0.20,
            flexibility: 0.20,
            multi_column_update: 0.30,
            aggregate: 0.50,
            multi_join: 0.50,
            strong_signal: 0.30,
            high_signal: 0.50,
        }
    }
}

/// Columns assigned per UPDATE at or above which the statement counts as a
/// multi-column (document-shaped) write.
const MULTI_COLUMN_UPDATE: usize = 3;
/// Fraction of nullable columns above which the schema reads as flexible.
const FLEXIBLE_NULLABLE_FRACTION: f64 = 0.5;

#[derive(Debug, Default)]
struct TableTraffic {
    total: f64,
    whole_row: f64,
    aggregate: f64,
    multi_join: f64,
    updates: f64,
    multi_column_updates: f64,
}

/// Classifies tables whose access profile strongly favors a document or a
/// relational layout.
#[derive(Debug, Clone, Default)]
pub struct StorageModelClassifier {
    weights: StorageModelWeights,
}

impl StorageModelClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: StorageModelWeights) -> Self {
        Self { weights }
    }

    fn traffic_for(&self, table: &TableMetadata, workload: &WorkloadFeatures) -> TableTraffic {
        let mut traffic = TableTraffic::default();
        for pattern in workload.patterns_for_table(&table.table_name) {
            let executions = pattern.executions as f64;
            traffic.total += executions;
            let shape = pattern.shape();
            match pattern.kind {
                QueryKind::Select => {
                    if shape.whole_row_fetch {
                        traffic.whole_row += executions;
                    }
                    if shape.has_aggregate {
                        traffic.aggregate += executions;
                    }
                }
                QueryKind::Update => {
                    traffic.updates += executions;
                    if shape.updated_columns >= MULTI_COLUMN_UPDATE {
                        traffic.multi_column_updates += executions;
                    }
                }
                _ => {}
            }
            if pattern.tables.len() >= 2 {
                traffic.multi_join += executions;
            }
        }
        traffic
    }

    fn classify(
        &self,
        table: &TableMetadata,
        traffic: &TableTraffic,
    ) -> Result<Option<DetectedPattern>> {
        if traffic.total == 0.0 {
            return Ok(None);
        }

        let whole_row_fraction = traffic.whole_row / traffic.total;
        let aggregate_fraction = traffic.aggregate / traffic.total;
        let multi_join_fraction = traffic.multi_join / traffic.total;
        let multi_column_update_fraction = if traffic.updates > 0.0 {
            traffic.multi_column_updates / traffic.updates
        } else {
            0.0
        };
        let flexible = if table.nullable_fraction() > FLEXIBLE_NULLABLE_FRACTION {
            1.0
        } else {
            0.0
        };

        let w = &self.weights;
        let document_score = w.whole_row * whole_row_fraction
            + w.object_access * whole_row_fraction
            + w.flexibility * flexible
            + w.multi_column_update * multi_column_update_fraction;
        let relational_score =
            w.aggregate * aggregate_fraction + w.multi_join * multi_join_fraction;

        let gap = document_score - relational_score;
        if gap.abs() <= w.strong_signal {
            return Ok(None);
        }

        let pattern_type = if gap > 0.0 {
            PatternType::DocumentCandidate
        } else {
            PatternType::RelationalCandidate
        };
        let severity = if gap.abs() >= w.high_signal {
            Severity::High
        } else {
            Severity::Medium
        };
        let confidence = gap.abs().min(1.0);

        let description = format!(
            "Table {} scores {:.2} document vs {:.2} relational \
             ({:.0}% whole-row fetches, {:.0}% aggregate queries, {:.0}% multi-table reads)",
            table.table_name,
            document_score,
            relational_score,
            whole_row_fraction * 100.0,
            aggregate_fraction * 100.0,
            multi_join_fraction * 100.0,
        );
        let hint = match pattern_type {
            PatternType::DocumentCandidate => {
                "Collapse the row into a JSON document column to match whole-object access"
            }
            _ => "Shred the document into typed relational columns to serve analytics",
        };

        let pattern = DetectedPattern::new(
            pattern_type,
            severity,
            confidence,
            vec![table.table_name.to_lowercase()],
            description,
        )?
        .with_metric("document_score", document_score)
        .with_metric("relational_score", relational_score)
        .with_metric("whole_row_fraction", whole_row_fraction)
        .with_metric("aggregate_fraction", aggregate_fraction)
        .with_metric("multi_join_fraction", multi_join_fraction)
        .with_metric("multi_column_update_fraction", multi_column_update_fraction)
        .with_metric("nullable_fraction", table.nullable_fraction())
        .with_hint(hint);

        Ok(Some(pattern))
    }
}

impl PatternDetector for StorageModelClassifier {
    fn name(&self) -> &'static str {
        "storage_model"
    }

    fn detect(
        &self,
        schema: &SchemaMetadata,
        workload: &WorkloadFeatures,
        _window: AnalysisWindow,
    ) -> Result<Vec<DetectedPattern>> {
        let mut patterns = Vec::new();
        for table in schema.tables() {
            let traffic = self.traffic_for(table, workload);
            if let Some(pattern) = self.classify(table, &traffic)? {
                patterns.push(pattern);
            }
        }
        Ok(patterns)
    }
}
