//! Reforge - Workload-Driven Schema Optimization Advisor
//!
//! Reforge analyzes a database workload and schema metadata to detect
//! optimization opportunities and turn them into ranked, justified,
//! implementable schema-change recommendations. It is an advisory engine,
//! not an executor: it never mutates the target database.
//!
//! # Pipeline
//!
//! A fixed six-stage sequence per run: collect (external) → detect
//! patterns → estimate costs → score priority → analyze tradeoffs and
//! conflicts → synthesize recommendations. Detector and estimator failures
//! degrade the run instead of aborting it.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use reforge::{Advisor, Result, TimeRange, WorkloadSource};
//!
//! fn run(source: Box<dyn WorkloadSource>, range: TimeRange) -> Result<()> {
//!     let advisor = Advisor::new(source)?;
//!     let result = advisor.run(&range, None)?;
//!
//!     for rec in &result.recommendations {
//!         println!("[{}] {}: {}", rec.priority_tier, rec.id, rec.description);
//!     }
//!     Ok(())
//! }
//! ```

pub mod conflict;
pub mod cost;
pub mod detect;
pub mod error;
pub mod pattern;
pub mod pipeline;
pub mod schema;
pub mod scoring;
pub mod synthesis;
pub mod tradeoff;
pub mod workload;

// Re-export commonly used types
pub use conflict::{ConflictKind, OptimizationConflict, Resolution};
pub use cost::{CostBreakdown, CostConfig, CostEstimate};
pub use error::{ReforgeError, Result};
pub use pattern::{DetectedPattern, MetricValue, PatternType, Severity};
pub use pipeline::{
    DetectorToggles, Pipeline, PipelineConfig, PipelineResult, ReportFormat, TimeRange,
    WorkloadSource,
};
pub use schema::{ColumnMetadata, SchemaMetadata, TableMetadata};
pub use scoring::{PriorityScorer, PriorityTier, ScoredEstimate, ScoringWeights};
pub use synthesis::{
    GeneratedSql, RecommendationKind, SchemaRecommendation, SqlGenerator,
};
pub use tradeoff::{TradeoffAnalysis, Verdict};
pub use workload::{
    AnalysisWindow, JoinInfo, JoinKind, QueryKind, QueryPattern, WorkloadFeatures,
};

/// Advisory engine facade.
///
/// Owns the external collaborators and a [`PipelineConfig`], and delegates
/// runs to the [`Pipeline`]. Stateless between runs.
pub struct Advisor {
    pipeline: Pipeline,
}

impl Advisor {
    /// Create an advisor over a workload source with the default
    /// configuration.
    pub fn new(source: Box<dyn WorkloadSource>) -> Result<Self> {
        Self::with_config(source, PipelineConfig::default())
    }

    /// Create an advisor with a custom configuration.
    pub fn with_config(source: Box<dyn WorkloadSource>, config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            pipeline: Pipeline::new(source, config)?,
        })
    }

    /// Attach the optional SQL generation collaborator.
    pub fn with_sql_generator(mut self, generator: Box<dyn SqlGenerator>) -> Self {
        self.pipeline = self.pipeline.with_sql_generator(generator);
        self
    }

    /// Analyze one snapshot and produce recommendations.
    pub fn run(
        &self,
        time_range: &TimeRange,
        schema_filter: Option<&str>,
    ) -> Result<PipelineResult> {
        self.pipeline.run(time_range, schema_filter)
    }
}
