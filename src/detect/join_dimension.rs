//! Expensive-join detection: hot joins against stable dimension tables
//! that denormalization would remove.

use std::collections::{BTreeMap, BTreeSet};

use crate::detect::PatternDetector;
use crate::error::Result;
use crate::pattern::{DetectedPattern, PatternType, Severity};
use crate::schema::SchemaMetadata;
use crate::workload::{AnalysisWindow, QueryKind, WorkloadFeatures};

/// Tunable thresholds for join-dimension analysis.
#[derive(Debug, Clone)]
pub struct JoinThresholds {
    /// Minimum join frequency as a percentage of total executions
    pub min_frequency_pct: f64,
    /// Maximum distinct columns fetched from the dimension table
    pub max_fetched_columns: usize,
    /// Row count at or below which a dimension table is "small"
    pub small_dimension_rows: u64,
    /// Daily update rate below which a large dimension is still acceptable
    pub max_dimension_updates_per_day: f64,
    /// Net benefit (ms/day) at or above which severity is HIGH
    pub high_benefit_ms_per_day: f64,
}

impl Default for JoinThresholds {
    fn default() -> Self {
        Self {
            min_frequency_pct: 10.0,
            max_fetched_columns: 10,
            small_dimension_rows: 100_000,
            max_dimension_updates_per_day: 50.0,
            high_benefit_ms_per_day: 60_000.0,
        }
    }
}

/// Fraction of a join query's latency attributed to the join itself.
const JOIN_LATENCY_SHARE: f64 = 0.4;
const MAX_CONFIDENCE: f64 = 0.95;

/// Per-pair aggregation of join traffic.
#[derive(Debug, Default)]
struct JoinAggregate {
    executions: u64,
    latency_weighted_sum: f64,
    fetched_columns: BTreeSet<String>,
}

/// Finds (fact, dimension) pairs joined often enough that denormalizing a
/// few dimension columns into the fact table pays for its propagation cost.
#[derive(Debug, Clone, Default)]
pub struct JoinDimensionAnalyzer {
    thresholds: JoinThresholds,
}

impl JoinDimensionAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: JoinThresholds) -> Self {
        Self { thresholds }
    }
}

/// Propagation cost in milliseconds per dimension update per denormalized
/// column, stepped by dimension size.
fn propagation_step_ms(dimension_rows: u64) -> f64 {
    if dimension_rows < 10_000 {
        0.5
    } else if dimension_rows < 100_000 {
        2.0
    } else {
        10.0
    }
}

impl PatternDetector for JoinDimensionAnalyzer {
    fn name(&self) -> &'static str {
        "join_dimension"
    }

    fn detect(
        &self,
        schema: &SchemaMetadata,
        workload: &WorkloadFeatures,
        window: AnalysisWindow,
    ) -> Result<Vec<DetectedPattern>> {
        if workload.total_executions == 0 {
            return Ok(Vec::new());
        }

        let mut aggregates: BTreeMap<(String, String), JoinAggregate> = BTreeMap::new();
        for pattern in &workload.patterns {
            for join in &pattern.joins {
                let key = (
                    join.left_table.to_lowercase(),
                    join.right_table.to_lowercase(),
                );
                let agg = aggregates.entry(key).or_default();
                agg.executions += pattern.executions;
                agg.latency_weighted_sum += pattern.avg_latency_ms * pattern.executions as f64;
                agg.fetched_columns
                    .extend(join.fetched_columns.iter().map(|c| c.to_lowercase()));
            }
        }

        let mut patterns = Vec::new();
        for ((left, right), agg) in aggregates {
            let frequency_pct =
                agg.executions as f64 / workload.total_executions as f64 * 100.0;
            if frequency_pct < self.thresholds.min_frequency_pct {
                continue;
            }
            if agg.fetched_columns.is_empty()
                || agg.fetched_columns.len() > self.thresholds.max_fetched_columns
            {
                continue;
            }

            // Dimension stability: small tables always qualify; large ones
            // only when rarely updated.
            let dimension = match schema.table(&right) {
                Some(t) => t,
                None => continue,
            };
            let dim_update_executions: u64 = workload
                .patterns_for_table(&right)
                .filter(|p| p.kind == QueryKind::Update)
                .map(|p| p.executions)
                .sum();
            let dim_updates_per_day = window.per_day(dim_update_executions as f64);
            if dimension.row_count > self.thresholds.small_dimension_rows
                && dim_updates_per_day >= self.thresholds.max_dimension_updates_per_day
            {
                continue;
            }

            let joins_per_day = window.per_day(agg.executions as f64);
            let avg_latency_ms = agg.latency_weighted_sum / agg.executions as f64;
            let join_cost_ms_per_day = joins_per_day * avg_latency_ms * JOIN_LATENCY_SHARE;
            let propagation_ms_per_day = dim_updates_per_day
                * propagation_step_ms(dimension.row_count)
                * agg.fetched_columns.len() as f64;
            let net_benefit = join_cost_ms_per_day - propagation_ms_per_day;
            if net_benefit <= 0.0 {
                continue;
            }

            let severity = if net_benefit >= self.thresholds.high_benefit_ms_per_day {
                Severity::High
            } else {
                Severity::Medium
            };
            let confidence = (frequency_pct / 100.0).min(MAX_CONFIDENCE);
            let columns: Vec<String> = agg.fetched_columns.iter().cloned().collect();

            let description = format!(
                "Join {} -> {} appears in {:.1}% of executions fetching {} column(s) \
                 from a {}-row dimension table; removing it saves an estimated \
                 {:.0} ms/day after update propagation",
                left,
                right,
                frequency_pct,
                columns.len(),
                dimension.row_count,
                net_benefit
            );

            let pattern = DetectedPattern::new(
                PatternType::ExpensiveJoin,
                severity,
                confidence,
                vec![left.clone(), right.clone()],
                description,
            )?
            .with_metric("join_frequency_pct", frequency_pct)
            .with_metric("executions_per_day", joins_per_day)
            .with_metric("avg_latency_ms", avg_latency_ms)
            .with_metric("dimension_rows", dimension.row_count as i64)
            .with_metric("dimension_updates_per_day", dim_updates_per_day)
            .with_metric("net_benefit_ms_per_day", net_benefit)
            .with_metric("columns_accessed", columns)
            .with_hint(format!(
                "Denormalize the fetched {} column(s) into {} and maintain them on \
                 dimension updates",
                agg.fetched_columns.len(),
                left
            ));

            patterns.push(pattern);
        }
        Ok(patterns)
    }
}
