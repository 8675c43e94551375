//! Cost estimation: per-pattern daily cost, implementation cost, and the
//! derived savings/ROI/payback figures.
//!
//! A factory maps each pattern type to a dedicated calculator. Estimates
//! are immutable once constructed; priority enrichment happens in a
//! separate scored value (see `scoring`).

mod calculators;

pub use calculators::{
    DenormalizationCalculator, DocumentMigrationCalculator, DualityViewCalculator,
    LobSplitCalculator, RelationalMigrationCalculator,
};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReforgeError, Result};
use crate::pattern::{DetectedPattern, PatternType};
use crate::schema::{SchemaMetadata, TableMetadata};
use crate::workload::{AnalysisWindow, WorkloadFeatures};

/// Additive cost components for one state (current or optimized), in
/// dollars per day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub read: f64,
    pub write: f64,
    pub cpu: f64,
    pub storage: f64,
    pub network: f64,
    /// Open-ended named components
    pub other: BTreeMap<String, f64>,
}

impl CostBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read(mut self, read: f64) -> Self {
        self.read = read;
        self
    }

    pub fn with_write(mut self, write: f64) -> Self {
        self.write = write;
        self
    }

    pub fn with_cpu(mut self, cpu: f64) -> Self {
        self.cpu = cpu;
        self
    }

    pub fn with_storage(mut self, storage: f64) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_network(mut self, network: f64) -> Self {
        self.network = network;
        self
    }

    pub fn with_other(mut self, name: impl Into<String>, cost: f64) -> Self {
        self.other.insert(name.into(), cost);
        self
    }

    /// Sum of all components.
    pub fn total(&self) -> f64 {
        self.read
            + self.write
            + self.cpu
            + self.storage
            + self.network
            + self.other.values().sum::<f64>()
    }
}

/// Per-unit prices and labor parameters for cost estimation.
///
/// Unit costs must be non-negative and the hourly rate positive;
/// `validate` enforces this before any estimation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    /// Dollars per KB read
    pub read_cost_per_kb: f64,
    /// Dollars per KB written
    pub write_cost_per_kb: f64,
    /// Dollars per row of CPU work
    pub cpu_cost_per_row: f64,
    /// Dollars per GB per day of storage
    pub storage_cost_per_gb_day: f64,
    /// Dollars per KB transferred
    pub network_cost_per_kb: f64,
    /// Engineering rate, dollars per hour
    pub hourly_rate: f64,
    /// Base schema-change hours
    pub schema_hours: f64,
    /// Base data-migration hours
    pub migration_hours: f64,
    /// Base application-change hours
    pub application_hours: f64,
    /// Base testing hours
    pub testing_hours: f64,
    /// Contingency multiplier applied to total labor cost
    pub risk_multiplier: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            read_cost_per_kb: 2.0e-6,
            write_cost_per_kb: 1.0e-5,
            cpu_cost_per_row: 1.0e-7,
            storage_cost_per_gb_day: 8.0e-4,
            network_cost_per_kb: 1.0e-6,
            hourly_rate: 150.0,
            schema_hours: 8.0,
            migration_hours: 16.0,
            application_hours: 24.0,
            testing_hours: 16.0,
            risk_multiplier: 1.2,
        }
    }
}

impl CostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hourly_rate(mut self, rate: f64) -> Self {
        self.hourly_rate = rate;
        self
    }

    pub fn with_risk_multiplier(mut self, multiplier: f64) -> Self {
        self.risk_multiplier = multiplier;
        self
    }

    /// Reject negative unit costs and non-positive labor parameters.
    pub fn validate(&self) -> Result<()> {
        let units = [
            ("read_cost_per_kb", self.read_cost_per_kb),
            ("write_cost_per_kb", self.write_cost_per_kb),
            ("cpu_cost_per_row", self.cpu_cost_per_row),
            ("storage_cost_per_gb_day", self.storage_cost_per_gb_day),
            ("network_cost_per_kb", self.network_cost_per_kb),
            ("schema_hours", self.schema_hours),
            ("migration_hours", self.migration_hours),
            ("application_hours", self.application_hours),
            ("testing_hours", self.testing_hours),
        ];
        for (name, value) in units {
            if value < 0.0 || value.is_nan() {
                return Err(ReforgeError::config(format!("{} must be >= 0", name)));
            }
        }
        if self.hourly_rate <= 0.0 || self.hourly_rate.is_nan() {
            return Err(ReforgeError::config("hourly_rate must be > 0"));
        }
        if self.risk_multiplier <= 0.0 || self.risk_multiplier.is_nan() {
            return Err(ReforgeError::config("risk_multiplier must be > 0"));
        }
        Ok(())
    }

    /// Labor cost for the given per-category hour multipliers.
    pub fn labor_cost(&self, multipliers: HourMultipliers) -> f64 {
        let hours = self.schema_hours * multipliers.schema
            + self.migration_hours * multipliers.migration
            + self.application_hours * multipliers.application
            + self.testing_hours * multipliers.testing;
        hours * self.hourly_rate * self.risk_multiplier
    }
}

/// Pattern-type-specific scaling of the base implementation hours.
#[derive(Debug, Clone, Copy)]
pub struct HourMultipliers {
    pub schema: f64,
    pub migration: f64,
    pub application: f64,
    pub testing: f64,
}

impl HourMultipliers {
    pub const fn uniform(factor: f64) -> Self {
        Self {
            schema: factor,
            migration: factor,
            application: factor,
            testing: factor,
        }
    }
}

/// Immutable cost estimate for one detected pattern. All derived fields
/// are computed at construction from the cost inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Pattern this estimate belongs to
    pub pattern_id: String,
    /// Pattern type, carried for downstream dispatch
    pub pattern_type: PatternType,
    /// Daily cost of the current layout
    pub current_cost_per_day: f64,
    /// Daily cost after the optimization
    pub optimized_cost_per_day: f64,
    /// One-time implementation cost
    pub implementation_cost: f64,
    /// Component breakdown of the current state
    pub current_breakdown: CostBreakdown,
    /// Component breakdown of the optimized state
    pub optimized_breakdown: CostBreakdown,
    /// Daily savings (current − optimized)
    pub daily_savings: f64,
    /// Savings over a year
    pub annual_savings: f64,
    /// First-year net benefit (annual savings − implementation cost)
    pub net_benefit: f64,
    /// Return on investment, percent; zero when implementation is free
    pub roi_percentage: f64,
    /// Days to recoup the implementation cost; `None` without positive
    /// daily savings
    pub payback_days: Option<f64>,
    /// Every heuristic ratio used, in human-readable form
    pub assumptions: Vec<String>,
}

impl CostEstimate {
    pub fn new(
        pattern_id: impl Into<String>,
        pattern_type: PatternType,
        current: CostBreakdown,
        optimized: CostBreakdown,
        implementation_cost: f64,
        assumptions: Vec<String>,
    ) -> Self {
        let current_cost_per_day = current.total();
        let optimized_cost_per_day = optimized.total();
        let daily_savings = current_cost_per_day - optimized_cost_per_day;
        let annual_savings = daily_savings * 365.0;
        let net_benefit = annual_savings - implementation_cost;
        let roi_percentage = if implementation_cost > 0.0 {
            net_benefit / implementation_cost * 100.0
        } else {
            0.0
        };
        let payback_days = if daily_savings > 0.0 {
            Some(implementation_cost / daily_savings)
        } else {
            None
        };
        Self {
            pattern_id: pattern_id.into(),
            pattern_type,
            current_cost_per_day,
            optimized_cost_per_day,
            implementation_cost,
            current_breakdown: current,
            optimized_breakdown: optimized,
            daily_savings,
            annual_savings,
            net_benefit,
            roi_percentage,
            payback_days,
            assumptions,
        }
    }

    /// Daily cost reduction as a percentage of the current cost.
    pub fn improvement_pct(&self) -> f64 {
        if self.current_cost_per_day > 0.0 {
            self.daily_savings / self.current_cost_per_day * 100.0
        } else {
            0.0
        }
    }
}

/// A pattern-type-specific cost calculator.
pub trait CostCalculator {
    fn estimate(
        &self,
        pattern: &DetectedPattern,
        table: &TableMetadata,
        workload: &WorkloadFeatures,
        window: AnalysisWindow,
        config: &CostConfig,
    ) -> Result<CostEstimate>;
}

/// Maps pattern types to calculators and runs them over a detection pass.
pub struct EstimatorFactory {
    config: CostConfig,
}

impl EstimatorFactory {
    /// Create a factory; fails when the configuration is invalid.
    pub fn new(config: CostConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn calculator(pattern_type: PatternType) -> Box<dyn CostCalculator> {
        match pattern_type {
            PatternType::LobCliff => Box::new(LobSplitCalculator),
            PatternType::ExpensiveJoin => Box::new(DenormalizationCalculator),
            PatternType::DocumentCandidate => Box::new(DocumentMigrationCalculator),
            PatternType::RelationalCandidate => Box::new(RelationalMigrationCalculator),
            PatternType::DualityViewOpportunity => Box::new(DualityViewCalculator),
        }
    }

    /// Estimate one pattern. Fails when the primary table cannot be
    /// resolved; callers deciding to continue should use `estimate_all`.
    pub fn estimate(
        &self,
        pattern: &DetectedPattern,
        schema: &SchemaMetadata,
        workload: &WorkloadFeatures,
        window: AnalysisWindow,
    ) -> Result<CostEstimate> {
        let table_name = pattern.primary_table().ok_or_else(|| {
            ReforgeError::estimation(format!("pattern {} names no table", pattern.id))
        })?;
        let table = schema.table(&table_name).ok_or_else(|| {
            ReforgeError::estimation(format!(
                "no metadata for table {} (pattern {})",
                table_name, pattern.id
            ))
        })?;
        Self::calculator(pattern.pattern_type).estimate(
            pattern,
            table,
            workload,
            window,
            &self.config,
        )
    }

    /// Estimate every pattern, skipping those whose table metadata is
    /// missing. Partial success by design; skips are logged.
    pub fn estimate_all(
        &self,
        patterns: &[DetectedPattern],
        schema: &SchemaMetadata,
        workload: &WorkloadFeatures,
        window: AnalysisWindow,
    ) -> Vec<CostEstimate> {
        let mut estimates = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            match self.estimate(pattern, schema, workload, window) {
                Ok(estimate) => estimates.push(estimate),
                Err(err) => {
                    debug!(pattern = %pattern.id, %err, "skipping cost estimation");
                }
            }
        }
        estimates
    }
}
