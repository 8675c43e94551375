//! Pipeline orchestration.
//!
//! A fixed six-stage sequence per run: collect → detect → estimate →
//! score → analyze tradeoffs/conflicts → synthesize. Detector and
//! estimator failures are caught, logged and skipped; only collection
//! failure or invalid initialization aborts a run. No stage mutates its
//! input collections.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::conflict::{ConflictDetector, OptimizationConflict};
use crate::cost::{CostConfig, EstimatorFactory};
use crate::detect::{
    DualityViewFinder, JoinDimensionAnalyzer, LobCliffDetector, PatternDetector,
    StorageModelClassifier,
};
use crate::error::{ReforgeError, Result};
use crate::pattern::DetectedPattern;
use crate::schema::{SchemaMetadata, TableMetadata};
use crate::scoring::{PriorityScorer, PriorityTier, ScoringWeights};
use crate::synthesis::{GeneratedSql, RecommendationSynthesizer, SchemaRecommendation, SqlGenerator};
use crate::tradeoff::TradeoffAnalyzer;
use crate::workload::{AnalysisWindow, WorkloadFeatures};

/// Snapshot bounds handed to the workload source. The duration doubles as
/// the default per-day normalization window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Snapshot duration in hours; zero or negative ranges read as zero.
    pub fn hours(&self) -> f64 {
        let seconds = (self.end - self.start).num_seconds();
        if seconds > 0 {
            seconds as f64 / 3600.0
        } else {
            0.0
        }
    }
}

/// External workload/schema producer.
pub trait WorkloadSource {
    /// Collect workload statistics and table metadata for the range,
    /// optionally restricted to one schema.
    fn collect(
        &self,
        time_range: &TimeRange,
        schema_filter: Option<&str>,
    ) -> Result<(WorkloadFeatures, Vec<TableMetadata>)>;
}

/// Which detectors a run executes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorToggles {
    pub lob_cliff: bool,
    pub expensive_join: bool,
    pub storage_model: bool,
    pub duality_view: bool,
}

impl Default for DetectorToggles {
    fn default() -> Self {
        Self {
            lob_cliff: true,
            expensive_join: true,
            storage_model: true,
            duality_view: true,
        }
    }
}

/// Pipeline configuration. Validated at construction via `build`.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Detector enable flags
    pub detectors: DetectorToggles,
    /// Patterns below this confidence are dropped, [0,1]
    pub min_confidence: f64,
    /// Recommendations below this priority score are dropped, [0,100]
    pub min_priority_score: f64,
    /// Merge duplicate statements before analysis
    pub compress_workload: bool,
    /// Hard cap on patterns analyzed, applied before statement parsing
    pub max_queries: usize,
    /// Override for the snapshot duration used in per-day normalization;
    /// defaults to the time range's own duration
    pub snapshot_hours: Option<f64>,
    /// Scoring weight profile
    pub weights: ScoringWeights,
    /// Cost model parameters
    pub cost: CostConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detectors: DetectorToggles::default(),
            min_confidence: 0.5,
            min_priority_score: 0.0,
            compress_workload: false,
            max_queries: 500,
            snapshot_hours: None,
            weights: ScoringWeights::balanced(),
            cost: CostConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_min_priority_score(mut self, min_priority_score: f64) -> Self {
        self.min_priority_score = min_priority_score;
        self
    }

    pub fn with_detectors(mut self, detectors: DetectorToggles) -> Self {
        self.detectors = detectors;
        self
    }

    pub fn with_max_queries(mut self, max_queries: usize) -> Self {
        self.max_queries = max_queries;
        self
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Validate ranges; called by `Pipeline::new`.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) || self.min_confidence.is_nan() {
            return Err(ReforgeError::config("min_confidence must be in [0,1]"));
        }
        if !(0.0..=100.0).contains(&self.min_priority_score) || self.min_priority_score.is_nan() {
            return Err(ReforgeError::config("min_priority_score must be in [0,100]"));
        }
        if self.max_queries == 0 {
            return Err(ReforgeError::config("max_queries must be positive"));
        }
        if let Some(hours) = self.snapshot_hours {
            if hours <= 0.0 || hours.is_nan() {
                return Err(ReforgeError::config("snapshot_hours must be positive"));
            }
        }
        self.cost.validate()
    }
}

/// Output format for result reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Indented text summary
    Text,
    /// Pretty-printed JSON for programmatic consumption
    Json,
}

/// Aggregated outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Run identifier
    pub run_id: Uuid,
    /// When the result was produced
    pub generated_at: DateTime<Utc>,
    /// Patterns surviving the confidence filter
    pub patterns_detected: usize,
    /// Final recommendations, sorted by priority tier
    pub recommendations: Vec<SchemaRecommendation>,
    /// Count of HIGH-tier recommendations
    pub high_priority: usize,
    /// Count of MEDIUM-tier recommendations
    pub medium_priority: usize,
    /// Count of LOW-tier recommendations
    pub low_priority: usize,
    /// Sum of annual savings across recommendations
    pub total_annual_savings: f64,
    /// Wall-clock duration of the run in milliseconds
    pub execution_ms: u64,
    /// Non-fatal errors collected along the way
    pub errors: Vec<String>,
}

impl PipelineResult {
    /// Build a result; tier counts and savings are derived from the
    /// recommendation list so they can never disagree with it.
    fn new(
        patterns_detected: usize,
        recommendations: Vec<SchemaRecommendation>,
        execution_ms: u64,
        errors: Vec<String>,
    ) -> Self {
        let high_priority = recommendations
            .iter()
            .filter(|r| r.priority_tier == PriorityTier::High)
            .count();
        let medium_priority = recommendations
            .iter()
            .filter(|r| r.priority_tier == PriorityTier::Medium)
            .count();
        let low_priority = recommendations
            .iter()
            .filter(|r| r.priority_tier == PriorityTier::Low)
            .count();
        let total_annual_savings = recommendations.iter().map(|r| r.annual_savings).sum();
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            patterns_detected,
            recommendations,
            high_priority,
            medium_priority,
            low_priority,
            total_annual_savings,
            execution_ms,
            errors,
        }
    }

    /// Number of recommendations.
    pub fn recommendation_count(&self) -> usize {
        self.recommendations.len()
    }

    /// Render the result as a report.
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ReportFormat::Text => Ok(self.to_text()),
        }
    }

    fn to_text(&self) -> String {
        let mut lines = vec![
            format!("Schema advisory report (run {})", self.run_id),
            format!(
                "  {} pattern(s) detected, {} recommendation(s): {} high / {} medium / {} low",
                self.patterns_detected,
                self.recommendations.len(),
                self.high_priority,
                self.medium_priority,
                self.low_priority
            ),
            format!(
                "  Estimated total annual savings: ${:.0} ({} ms)",
                self.total_annual_savings, self.execution_ms
            ),
        ];
        for rec in &self.recommendations {
            lines.push(format!(
                "  [{}] {} {} (score {:.0}) -> {}",
                rec.priority_tier,
                rec.id,
                rec.kind,
                rec.priority_score,
                rec.target_objects.join(", ")
            ));
        }
        if !self.errors.is_empty() {
            lines.push(format!("  {} stage error(s):", self.errors.len()));
            for err in &self.errors {
                lines.push(format!("    - {}", err));
            }
        }
        lines.join("\n")
    }
}

/// The six-stage advisory pipeline.
pub struct Pipeline {
    source: Box<dyn WorkloadSource>,
    sql_generator: Option<Box<dyn SqlGenerator>>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline; fails when the configuration is invalid.
    pub fn new(source: Box<dyn WorkloadSource>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            sql_generator: None,
            config,
        })
    }

    /// Attach the optional SQL generation collaborator.
    pub fn with_sql_generator(mut self, generator: Box<dyn SqlGenerator>) -> Self {
        self.sql_generator = Some(generator);
        self
    }

    fn detectors(&self) -> Vec<Box<dyn PatternDetector>> {
        let toggles = &self.config.detectors;
        let mut detectors: Vec<Box<dyn PatternDetector>> = Vec::new();
        if toggles.lob_cliff {
            detectors.push(Box::new(LobCliffDetector::new()));
        }
        if toggles.expensive_join {
            detectors.push(Box::new(JoinDimensionAnalyzer::new()));
        }
        if toggles.storage_model {
            detectors.push(Box::new(StorageModelClassifier::new()));
        }
        if toggles.duality_view {
            detectors.push(Box::new(DualityViewFinder::new()));
        }
        detectors
    }

    /// Run the full pipeline over one snapshot.
    pub fn run(
        &self,
        time_range: &TimeRange,
        schema_filter: Option<&str>,
    ) -> Result<PipelineResult> {
        let started = Instant::now();
        let mut errors: Vec<String> = Vec::new();

        // Stage 1: collect. Failure here aborts the run.
        let (workload, tables) =
            self.source
                .collect(time_range, schema_filter)
                .map_err(|e| match e {
                    ReforgeError::Collection { .. } => e,
                    other => ReforgeError::collection(other.to_string()),
                })?;
        let schema = SchemaMetadata::new(tables)?;

        let window = AnalysisWindow::hours(
            self.config.snapshot_hours.unwrap_or_else(|| time_range.hours()),
        );

        let workload = workload.capped(self.config.max_queries);
        let workload = if self.config.compress_workload {
            workload.compressed()
        } else {
            workload
        };

        if workload.is_empty() {
            debug!("collection yielded no queries");
            return Ok(PipelineResult::new(
                0,
                Vec::new(),
                elapsed_ms(started),
                errors,
            ));
        }

        // Stage 2: detect, best-effort per detector.
        let mut patterns: Vec<DetectedPattern> = Vec::new();
        for detector in self.detectors() {
            match detector.detect(&schema, &workload, window) {
                Ok(found) => patterns.extend(found),
                Err(err) => {
                    warn!(detector = detector.name(), %err, "detector failed; skipping");
                    errors.push(format!("detector {} failed: {}", detector.name(), err));
                }
            }
        }
        patterns.retain(|p| p.confidence >= self.config.min_confidence);

        if patterns.is_empty() {
            return Ok(PipelineResult::new(
                0,
                Vec::new(),
                elapsed_ms(started),
                errors,
            ));
        }

        // Stage 3: estimate costs; unresolvable patterns are skipped inside
        // the factory.
        let factory = EstimatorFactory::new(self.config.cost.clone())?;
        let estimates = factory.estimate_all(&patterns, &schema, &workload, window);

        // Stage 4: score and rank.
        let scorer = PriorityScorer::new(self.config.weights);
        let pairs = estimates
            .into_iter()
            .filter_map(|estimate| {
                patterns
                    .iter()
                    .find(|p| p.id == estimate.pattern_id)
                    .map(|p| (estimate, p.severity))
            })
            .collect();
        let scored = scorer.rank(pairs);

        // Stage 5: tradeoffs and conflicts over the full estimate set.
        let analyzer = TradeoffAnalyzer::new();
        let mut tradeoffs = Vec::with_capacity(scored.len());
        for entry in &scored {
            let Some(pattern) = patterns.iter().find(|p| p.id == entry.estimate.pattern_id)
            else {
                continue;
            };
            match analyzer.analyze(pattern, entry, &workload) {
                Ok(analysis) => tradeoffs.push(analysis),
                Err(err) => {
                    warn!(pattern = %pattern.id, %err, "tradeoff analysis failed; skipping");
                    errors.push(format!("tradeoff analysis for {} failed: {}", pattern.id, err));
                }
            }
        }
        let conflicts: Vec<OptimizationConflict> =
            ConflictDetector::new().detect(&patterns, &scored);

        // Stage 6: synthesize, filter, sort.
        let generated = self.generate_sql(&patterns, &schema, &workload, &mut errors);
        let mut synthesizer = RecommendationSynthesizer::new();
        let mut recommendations =
            synthesizer.synthesize_all(&patterns, &scored, &tradeoffs, &conflicts, &generated);
        recommendations.retain(|r| r.priority_score >= self.config.min_priority_score);
        recommendations.sort_by(|a, b| b.priority_tier.cmp(&a.priority_tier));

        Ok(PipelineResult::new(
            patterns.len(),
            recommendations,
            elapsed_ms(started),
            errors,
        ))
    }

    /// Call the optional SQL generator per pattern. Failures degrade the
    /// pattern to placeholder SQL and are recorded.
    fn generate_sql(
        &self,
        patterns: &[DetectedPattern],
        schema: &SchemaMetadata,
        workload: &WorkloadFeatures,
        errors: &mut Vec<String>,
    ) -> Vec<(String, GeneratedSql)> {
        let Some(generator) = &self.sql_generator else {
            return Vec::new();
        };
        let mut generated = Vec::new();
        for pattern in patterns {
            let Some(table) = pattern.primary_table().and_then(|t| schema.table(&t)) else {
                continue;
            };
            match generator.generate(pattern, table, workload) {
                Ok(sql) => generated.push((pattern.id.clone(), sql)),
                Err(err) => {
                    warn!(pattern = %pattern.id, %err, "SQL generation failed; using placeholder");
                    errors.push(format!(
                        "SQL generation for {} failed, placeholder used: {}",
                        pattern.id, err
                    ));
                }
            }
        }
        generated
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnMetadata;
    use crate::workload::{QueryKind, QueryPattern};

    struct FixedSource {
        workload: WorkloadFeatures,
        tables: Vec<TableMetadata>,
    }

    impl WorkloadSource for FixedSource {
        fn collect(
            &self,
            _time_range: &TimeRange,
            _schema_filter: Option<&str>,
        ) -> Result<(WorkloadFeatures, Vec<TableMetadata>)> {
            Ok((self.workload.clone(), self.tables.clone()))
        }
    }

    struct FailingSource;

    impl WorkloadSource for FailingSource {
        fn collect(
            &self,
            _time_range: &TimeRange,
            _schema_filter: Option<&str>,
        ) -> Result<(WorkloadFeatures, Vec<TableMetadata>)> {
            Err(ReforgeError::collection("snapshot reader offline"))
        }
    }

    fn day_range() -> TimeRange {
        let end = Utc::now();
        TimeRange::new(end - chrono::Duration::hours(24), end)
    }

    fn lob_fixture() -> FixedSource {
        let table = TableMetadata::new("app", "orders", 100_000, 600.0).with_columns(vec![
            ColumnMetadata::new("id", "NUMBER", false, 8.0),
            ColumnMetadata::new("payload", "CLOB", true, 12_288.0),
        ]);
        let workload = WorkloadFeatures::new(vec![QueryPattern::new(
            "u1",
            "UPDATE orders SET payload = :1 WHERE id = :2",
            QueryKind::Update,
            150,
            3.0,
            vec!["orders".into()],
        )]);
        FixedSource {
            workload,
            tables: vec![table],
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig::default().with_min_confidence(1.5);
        assert!(Pipeline::new(Box::new(FailingSource), config).is_err());

        let config = PipelineConfig::default().with_min_priority_score(150.0);
        assert!(Pipeline::new(Box::new(FailingSource), config).is_err());
    }

    #[test]
    fn test_collection_failure_aborts() {
        let pipeline =
            Pipeline::new(Box::new(FailingSource), PipelineConfig::default()).unwrap();
        let result = pipeline.run(&day_range(), None);
        assert!(matches!(result, Err(ReforgeError::Collection { .. })));
    }

    #[test]
    fn test_empty_workload_yields_empty_result() {
        let source = FixedSource {
            workload: WorkloadFeatures::empty(),
            tables: vec![TableMetadata::new("app", "orders", 1_000, 100.0)],
        };
        let pipeline = Pipeline::new(Box::new(source), PipelineConfig::default()).unwrap();
        let result = pipeline.run(&day_range(), None).unwrap();
        assert_eq!(result.patterns_detected, 0);
        assert!(result.recommendations.is_empty());
        assert_eq!(result.recommendation_count(), 0);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_lob_run_end_to_end() {
        let pipeline =
            Pipeline::new(Box::new(lob_fixture()), PipelineConfig::default()).unwrap();
        let result = pipeline.run(&day_range(), None).unwrap();
        assert_eq!(result.patterns_detected, 1);
        assert_eq!(result.recommendation_count(), 1);
        let counted =
            result.high_priority + result.medium_priority + result.low_priority;
        assert_eq!(counted, result.recommendations.len());
    }

    #[test]
    fn test_disabled_detector_suppresses_patterns() {
        let config = PipelineConfig::default().with_detectors(DetectorToggles {
            lob_cliff: false,
            ..DetectorToggles::default()
        });
        let pipeline = Pipeline::new(Box::new(lob_fixture()), config).unwrap();
        let result = pipeline.run(&day_range(), None).unwrap();
        assert_eq!(result.patterns_detected, 0);
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_text_report_renders() {
        let pipeline =
            Pipeline::new(Box::new(lob_fixture()), PipelineConfig::default()).unwrap();
        let result = pipeline.run(&day_range(), None).unwrap();
        let report = result.render(ReportFormat::Text).unwrap();
        assert!(report.contains("recommendation"));
        let json = result.render(ReportFormat::Json).unwrap();
        assert!(json.contains("\"recommendations\""));
    }
}
