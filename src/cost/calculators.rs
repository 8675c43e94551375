//! Pattern-type-specific cost calculators.
//!
//! Every heuristic ratio a calculator uses is recorded as an assumption
//! string on the estimate. Missing pattern metrics never fail an
//! estimation; they fall back to conservative placeholders that are also
//! recorded.

use crate::cost::{CostBreakdown, CostCalculator, CostConfig, CostEstimate, HourMultipliers};
use crate::error::Result;
use crate::pattern::{DetectedPattern, PatternType};
use crate::schema::TableMetadata;
use crate::workload::{AnalysisWindow, QueryKind, WorkloadFeatures};

const KB: f64 = 1024.0;

fn selects_per_day(
    table: &TableMetadata,
    workload: &WorkloadFeatures,
    window: AnalysisWindow,
) -> f64 {
    let executions: u64 = workload
        .patterns_for_table(&table.table_name)
        .filter(|p| p.kind == QueryKind::Select)
        .map(|p| p.executions)
        .sum();
    window.per_day(executions as f64)
}

fn executions_per_day(
    table: &TableMetadata,
    workload: &WorkloadFeatures,
    window: AnalysisWindow,
) -> f64 {
    window.per_day(workload.executions_for_table(&table.table_name) as f64)
}

/// Pull a numeric metric, recording an assumption when the fallback is
/// used.
fn metric_or_assume(
    pattern: &DetectedPattern,
    key: &str,
    default: f64,
    assumptions: &mut Vec<String>,
) -> f64 {
    if let Some(value) = pattern.metrics.get(key).and_then(|m| m.as_f64()) {
        value
    } else {
        assumptions.push(format!(
            "Metric '{}' absent; assumed {} as a conservative placeholder",
            key, default
        ));
        default
    }
}

// ---------------------------------------------------------------------------
// LOB split
// ---------------------------------------------------------------------------

/// Costs splitting a hot LOB column away from its full-document rewrites.
pub struct LobSplitCalculator;

impl CostCalculator for LobSplitCalculator {
    fn estimate(
        &self,
        pattern: &DetectedPattern,
        table: &TableMetadata,
        _workload: &WorkloadFeatures,
        _window: AnalysisWindow,
        config: &CostConfig,
    ) -> Result<CostEstimate> {
        let mut assumptions = Vec::new();
        let updates_per_day = metric_or_assume(pattern, "updates_per_day", 0.0, &mut assumptions);
        let avg_size_kb = metric_or_assume(pattern, "avg_size_kb", 4.0, &mut assumptions);
        let selectivity =
            metric_or_assume(pattern, "update_selectivity", 0.5, &mut assumptions);

        assumptions.push(
            "Assumed every update rewrites the full document in the current layout".to_string(),
        );
        assumptions.push(format!(
            "Assumed the split confines each rewrite to {:.0}% of the document",
            selectivity * 100.0
        ));
        assumptions.push("Assumed 10% storage overhead for the split layout".to_string());

        let storage_cost = table.size_gb() * config.storage_cost_per_gb_day;
        let current = CostBreakdown::new()
            .with_read(updates_per_day * avg_size_kb * config.read_cost_per_kb)
            .with_write(updates_per_day * avg_size_kb * config.write_cost_per_kb)
            .with_cpu(updates_per_day * config.cpu_cost_per_row)
            .with_storage(storage_cost);
        let optimized = CostBreakdown::new()
            .with_read(updates_per_day * avg_size_kb * selectivity * config.read_cost_per_kb)
            .with_write(updates_per_day * avg_size_kb * selectivity * config.write_cost_per_kb)
            .with_cpu(updates_per_day * config.cpu_cost_per_row)
            .with_storage(storage_cost * 1.1);

        // Splitting a column barely touches application code.
        let labor = config.labor_cost(HourMultipliers {
            schema: 1.0,
            migration: 1.0,
            application: 0.25,
            testing: 1.0,
        });

        Ok(CostEstimate::new(
            pattern.id.clone(),
            PatternType::LobCliff,
            current,
            optimized,
            labor,
            assumptions,
        ))
    }
}

// ---------------------------------------------------------------------------
// Join denormalization
// ---------------------------------------------------------------------------

/// Costs denormalizing dimension columns into the fact table.
pub struct DenormalizationCalculator;

/// Fact rows touched per dimension-row update.
const PROPAGATION_FANOUT: f64 = 10.0;
/// Average denormalized column width in bytes.
const DENORM_COLUMN_BYTES: f64 = 50.0;
/// Dimension row lookup size per join, KB.
const DIM_LOOKUP_KB: f64 = 1.0;

impl CostCalculator for DenormalizationCalculator {
    fn estimate(
        &self,
        pattern: &DetectedPattern,
        table: &TableMetadata,
        _workload: &WorkloadFeatures,
        _window: AnalysisWindow,
        config: &CostConfig,
    ) -> Result<CostEstimate> {
        let mut assumptions = Vec::new();
        let joins_per_day =
            metric_or_assume(pattern, "executions_per_day", 0.0, &mut assumptions);
        let dim_updates_per_day =
            metric_or_assume(pattern, "dimension_updates_per_day", 0.0, &mut assumptions);
        let columns = pattern
            .metrics
            .get("columns_accessed")
            .and_then(|m| m.as_list())
            .map(|l| l.len() as f64)
            .unwrap_or_else(|| {
                assumptions.push(
                    "Metric 'columns_accessed' absent; assumed 2 denormalized columns".to_string(),
                );
                2.0
            });

        assumptions.push(format!(
            "Assumed each join reads a {:.1} KB dimension row",
            DIM_LOOKUP_KB
        ));
        assumptions.push(format!(
            "Assumed each dimension update propagates to {:.0} fact rows",
            PROPAGATION_FANOUT
        ));
        assumptions.push(format!(
            "Assumed {:.0} bytes per denormalized column",
            DENORM_COLUMN_BYTES
        ));

        let fetched_kb = columns * DENORM_COLUMN_BYTES / KB;
        let current = CostBreakdown::new()
            .with_read(joins_per_day * DIM_LOOKUP_KB * config.read_cost_per_kb)
            .with_cpu(joins_per_day * 2.0 * config.cpu_cost_per_row)
            .with_network(joins_per_day * fetched_kb * config.network_cost_per_kb);

        let added_storage_gb =
            table.row_count as f64 * columns * DENORM_COLUMN_BYTES / (KB * KB * KB);
        let optimized = CostBreakdown::new()
            .with_read(joins_per_day * fetched_kb * config.read_cost_per_kb)
            .with_cpu(joins_per_day * config.cpu_cost_per_row)
            .with_network(joins_per_day * fetched_kb * config.network_cost_per_kb)
            .with_write(
                dim_updates_per_day * PROPAGATION_FANOUT * fetched_kb * config.write_cost_per_kb,
            )
            .with_storage(added_storage_gb * config.storage_cost_per_gb_day);

        let labor = config.labor_cost(HourMultipliers::uniform(1.0));

        Ok(CostEstimate::new(
            pattern.id.clone(),
            PatternType::ExpensiveJoin,
            current,
            optimized,
            labor,
            assumptions,
        ))
    }
}

// ---------------------------------------------------------------------------
// Document migration
// ---------------------------------------------------------------------------

/// Costs converting a row-shaped table into a document layout.
pub struct DocumentMigrationCalculator;

/// Reads needed to assemble the object from normalized rows.
const ASSEMBLY_FACTOR: f64 = 3.0;
/// Size overhead of the document encoding.
const DOCUMENT_OVERHEAD: f64 = 1.2;

impl CostCalculator for DocumentMigrationCalculator {
    fn estimate(
        &self,
        pattern: &DetectedPattern,
        table: &TableMetadata,
        workload: &WorkloadFeatures,
        window: AnalysisWindow,
        config: &CostConfig,
    ) -> Result<CostEstimate> {
        let assumptions = vec![
            format!(
                "Assumed assembling the object today takes {:.0} row reads",
                ASSEMBLY_FACTOR
            ),
            format!(
                "Assumed document encoding inflates read size by {:.0}%",
                (DOCUMENT_OVERHEAD - 1.0) * 100.0
            ),
            "Assumed 15% storage overhead for embedded redundancy".to_string(),
        ];

        let reads_per_day = selects_per_day(table, workload, window);
        let row_kb = table.avg_row_bytes / KB;
        let storage_cost = table.size_gb() * config.storage_cost_per_gb_day;

        let current = CostBreakdown::new()
            .with_read(reads_per_day * row_kb * ASSEMBLY_FACTOR * config.read_cost_per_kb)
            .with_cpu(reads_per_day * ASSEMBLY_FACTOR * config.cpu_cost_per_row)
            .with_storage(storage_cost);
        let optimized = CostBreakdown::new()
            .with_read(reads_per_day * row_kb * DOCUMENT_OVERHEAD * config.read_cost_per_kb)
            .with_cpu(reads_per_day * config.cpu_cost_per_row)
            .with_storage(storage_cost * 1.15);

        // Reshaping data is the dominant effort for a storage-model change.
        let labor = config.labor_cost(HourMultipliers {
            schema: 2.5,
            migration: 3.0,
            application: 1.0,
            testing: 2.0,
        });

        Ok(CostEstimate::new(
            pattern.id.clone(),
            PatternType::DocumentCandidate,
            current,
            optimized,
            labor,
            assumptions,
        ))
    }
}

// ---------------------------------------------------------------------------
// Relational migration
// ---------------------------------------------------------------------------

/// Costs shredding a document-shaped table into typed columns.
pub struct RelationalMigrationCalculator;

/// Fraction of the document analytic queries actually need.
const COLUMN_TARGET_FRACTION: f64 = 0.4;

impl CostCalculator for RelationalMigrationCalculator {
    fn estimate(
        &self,
        pattern: &DetectedPattern,
        table: &TableMetadata,
        workload: &WorkloadFeatures,
        window: AnalysisWindow,
        config: &CostConfig,
    ) -> Result<CostEstimate> {
        let assumptions = vec![
            format!(
                "Assumed analytic queries need only {:.0}% of each document",
                COLUMN_TARGET_FRACTION * 100.0
            ),
            "Assumed typed columns store 10% denser than the document encoding".to_string(),
        ];

        let reads_per_day = selects_per_day(table, workload, window);
        let row_kb = table.avg_row_bytes / KB;
        let storage_cost = table.size_gb() * config.storage_cost_per_gb_day;

        let current = CostBreakdown::new()
            .with_read(reads_per_day * row_kb * config.read_cost_per_kb)
            .with_cpu(reads_per_day * 2.0 * config.cpu_cost_per_row)
            .with_storage(storage_cost);
        let optimized = CostBreakdown::new()
            .with_read(reads_per_day * row_kb * COLUMN_TARGET_FRACTION * config.read_cost_per_kb)
            .with_cpu(reads_per_day * config.cpu_cost_per_row)
            .with_storage(storage_cost * 0.9);

        let labor = config.labor_cost(HourMultipliers {
            schema: 2.5,
            migration: 3.0,
            application: 1.0,
            testing: 2.0,
        });

        Ok(CostEstimate::new(
            pattern.id.clone(),
            PatternType::RelationalCandidate,
            current,
            optimized,
            labor,
            assumptions,
        ))
    }
}

// ---------------------------------------------------------------------------
// Duality view
// ---------------------------------------------------------------------------

/// Costs exposing a table through a duality view instead of app-side
/// conversion between shapes.
pub struct DualityViewCalculator;

/// CPU saved by moving conversion into the database.
const CPU_REDUCTION: f64 = 0.3;
/// Network saved by shipping only the requested shape.
const NETWORK_REDUCTION: f64 = 0.2;

impl CostCalculator for DualityViewCalculator {
    fn estimate(
        &self,
        pattern: &DetectedPattern,
        table: &TableMetadata,
        workload: &WorkloadFeatures,
        window: AnalysisWindow,
        config: &CostConfig,
    ) -> Result<CostEstimate> {
        let assumptions = vec![
            format!(
                "Assumed in-database shape conversion cuts CPU by {:.0}%",
                CPU_REDUCTION * 100.0
            ),
            format!(
                "Assumed shape-targeted responses cut transfer by {:.0}%",
                NETWORK_REDUCTION * 100.0
            ),
        ];

        let total_per_day = executions_per_day(table, workload, window);
        let row_kb = table.avg_row_bytes / KB;

        let current = CostBreakdown::new()
            .with_cpu(total_per_day * 2.0 * config.cpu_cost_per_row)
            .with_network(total_per_day * row_kb * config.network_cost_per_kb);
        let optimized = CostBreakdown::new()
            .with_cpu(total_per_day * 2.0 * (1.0 - CPU_REDUCTION) * config.cpu_cost_per_row)
            .with_network(
                total_per_day * row_kb * (1.0 - NETWORK_REDUCTION) * config.network_cost_per_kb,
            );

        // A view over the existing table: no data migration to speak of.
        let labor = config.labor_cost(HourMultipliers::uniform(0.5));

        Ok(CostEstimate::new(
            pattern.id.clone(),
            PatternType::DualityViewOpportunity,
            current,
            optimized,
            labor,
            assumptions,
        ))
    }
}
