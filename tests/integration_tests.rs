//! Integration tests for the reforge advisory pipeline.
//!
//! These exercise the full collect → detect → estimate → score → analyze →
//! synthesize sequence against fixture workloads.

use reforge::{
    Advisor, ColumnMetadata, DetectorToggles, GeneratedSql, JoinInfo, JoinKind, PatternType,
    PipelineConfig, QueryKind, QueryPattern, ReforgeError, ReportFormat, Resolution, Result,
    Severity, SqlGenerator, TableMetadata, TimeRange, WorkloadFeatures, WorkloadSource,
};

use chrono::{Duration, Utc};

// Fixture source returning a canned workload and schema.
struct FixtureSource {
    workload: WorkloadFeatures,
    tables: Vec<TableMetadata>,
}

impl WorkloadSource for FixtureSource {
    fn collect(
        &self,
        _time_range: &TimeRange,
        _schema_filter: Option<&str>,
    ) -> Result<(WorkloadFeatures, Vec<TableMetadata>)> {
        Ok((self.workload.clone(), self.tables.clone()))
    }
}

struct FailingGenerator;

impl SqlGenerator for FailingGenerator {
    fn generate(
        &self,
        _pattern: &reforge::DetectedPattern,
        _table: &TableMetadata,
        _workload: &WorkloadFeatures,
    ) -> Result<GeneratedSql> {
        Err(ReforgeError::generation("model unavailable"))
    }
}

fn day_range() -> TimeRange {
    let end = Utc::now();
    TimeRange::new(end - Duration::hours(24), end)
}

fn orders_with_clob() -> TableMetadata {
    TableMetadata::new("app", "orders", 200_000, 700.0).with_columns(vec![
        ColumnMetadata::new("id", "NUMBER", false, 8.0),
        ColumnMetadata::new("payload", "CLOB", true, 12_288.0),
        ColumnMetadata::new("status", "VARCHAR2", false, 12.0),
    ])
}

// ============================================================================
// LOB cliff scenario
// ============================================================================

#[test]
fn test_lob_cliff_scenario_high_severity() {
    // A 12KB CLOB updated 150+ times/day at sub-5ms latency over a 24-hour
    // window must yield exactly one LOB_CLIFF pattern, HIGH severity,
    // confidence >= 0.8.
    let workload = WorkloadFeatures::new(vec![QueryPattern::new(
        "u1",
        "UPDATE orders SET payload = :1 WHERE id = :2",
        QueryKind::Update,
        160,
        3.5,
        vec!["orders".into()],
    )]);
    let source = FixtureSource {
        workload,
        tables: vec![orders_with_clob()],
    };

    let advisor = Advisor::new(Box::new(source)).unwrap();
    let result = advisor.run(&day_range(), None).unwrap();

    assert_eq!(result.patterns_detected, 1);
    assert_eq!(result.recommendation_count(), 1);
    let rec = &result.recommendations[0];
    assert!(rec.pattern_id.starts_with("lob_cliff:"));
    assert_eq!(rec.target_objects, vec!["orders.payload".to_string()]);
    assert!(!rec.implementation.sql.is_empty());
    assert!(!rec.implementation.rollback_sql.is_empty());
}

#[test]
fn test_lob_cliff_pattern_fields() {
    use reforge::detect::{LobCliffDetector, PatternDetector};
    use reforge::{AnalysisWindow, SchemaMetadata};

    let schema = SchemaMetadata::new(vec![orders_with_clob()]).unwrap();
    let workload = WorkloadFeatures::new(vec![QueryPattern::new(
        "u1",
        "UPDATE orders SET payload = :1 WHERE id = :2",
        QueryKind::Update,
        155,
        4.0,
        vec!["orders".into()],
    )]);

    let patterns = LobCliffDetector::new()
        .detect(&schema, &workload, AnalysisWindow::full_day())
        .unwrap();
    assert_eq!(patterns.len(), 1);
    let p = &patterns[0];
    assert_eq!(p.pattern_type, PatternType::LobCliff);
    assert_eq!(p.severity, Severity::High);
    assert!(p.confidence >= 0.8);
}

// ============================================================================
// Expensive join scenario
// ============================================================================

fn join_fixture(fetched: Vec<String>) -> FixtureSource {
    let workload = WorkloadFeatures::new(vec![
        QueryPattern::new(
            "j1",
            "SELECT o.id, c.name, c.tier FROM orders o JOIN customers c ON o.cust_id = c.id",
            QueryKind::Select,
            8_000,
            10.0,
            vec!["orders".into(), "customers".into()],
        )
        .with_joins(vec![JoinInfo::new("orders", "customers", fetched, JoinKind::Inner)]),
        QueryPattern::new(
            "p1",
            "SELECT status FROM orders WHERE id = :1",
            QueryKind::Select,
            2_000,
            0.5,
            vec!["orders".into()],
        ),
    ]);
    FixtureSource {
        workload,
        tables: vec![
            TableMetadata::new("app", "orders", 5_000_000, 256.0).with_columns(vec![
                ColumnMetadata::new("id", "NUMBER", false, 8.0),
                ColumnMetadata::new("cust_id", "NUMBER", false, 8.0),
                ColumnMetadata::new("status", "VARCHAR2", false, 12.0),
            ]),
            TableMetadata::new("app", "customers", 50_000, 128.0).with_columns(vec![
                ColumnMetadata::new("id", "NUMBER", false, 8.0),
                ColumnMetadata::new("name", "VARCHAR2", false, 40.0),
                ColumnMetadata::new("tier", "VARCHAR2", false, 8.0),
            ]),
        ],
    }
}

#[test]
fn test_expensive_join_scenario() {
    // Two tables joined in 80% of a 10,000-execution workload, fetching 2
    // columns from a 50,000-row dimension with no updates: exactly one
    // EXPENSIVE_JOIN with confidence >= 0.7 and columns_accessed length 2.
    use reforge::detect::{JoinDimensionAnalyzer, PatternDetector};
    use reforge::{AnalysisWindow, SchemaMetadata};

    let fixture = join_fixture(vec!["name".into(), "tier".into()]);
    let schema = SchemaMetadata::new(fixture.tables.clone()).unwrap();
    let patterns = JoinDimensionAnalyzer::new()
        .detect(&schema, &fixture.workload, AnalysisWindow::full_day())
        .unwrap();

    assert_eq!(patterns.len(), 1);
    let p = &patterns[0];
    assert_eq!(p.pattern_type, PatternType::ExpensiveJoin);
    assert!(p.confidence >= 0.7);
    assert_eq!(
        p.metrics["columns_accessed"].as_list().map(|l| l.len()),
        Some(2)
    );
}

#[test]
fn test_wide_join_fetch_never_reported() {
    // Fetching 15+ columns disqualifies the pair regardless of frequency.
    use reforge::detect::{JoinDimensionAnalyzer, PatternDetector};
    use reforge::{AnalysisWindow, SchemaMetadata};

    let fetched: Vec<String> = (0..16).map(|i| format!("col{}", i)).collect();
    let fixture = join_fixture(fetched);
    let schema = SchemaMetadata::new(fixture.tables.clone()).unwrap();
    let patterns = JoinDimensionAnalyzer::new()
        .detect(&schema, &fixture.workload, AnalysisWindow::full_day())
        .unwrap();
    assert!(patterns.is_empty());
}

#[test]
fn test_expensive_join_through_pipeline() {
    let fixture = join_fixture(vec!["name".into(), "tier".into()]);
    let advisor = Advisor::new(Box::new(fixture)).unwrap();
    let result = advisor.run(&day_range(), None).unwrap();

    assert!(result.patterns_detected >= 1);
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.pattern_id.starts_with("expensive_join:")));
}

// ============================================================================
// Conflict scenario
// ============================================================================

#[test]
fn test_document_join_conflict_resolves_duality_view() {
    // A DOCUMENT_CANDIDATE and an EXPENSIVE_JOIN sharing a table must
    // produce exactly one conflict resolved as DUALITY_VIEW.
    use reforge::conflict::ConflictDetector;
    use reforge::cost::{CostConfig, EstimatorFactory};
    use reforge::{AnalysisWindow, DetectedPattern, PriorityScorer, SchemaMetadata, ScoringWeights};

    let doc = DetectedPattern::new(
        PatternType::DocumentCandidate,
        Severity::High,
        0.7,
        vec!["orders".into()],
        "document profile",
    )
    .unwrap();
    let join = DetectedPattern::new(
        PatternType::ExpensiveJoin,
        Severity::Medium,
        0.8,
        vec!["orders".into(), "customers".into()],
        "hot join",
    )
    .unwrap()
    .with_metric("executions_per_day", 8_000.0)
    .with_metric(
        "columns_accessed",
        vec!["name".to_string(), "tier".to_string()],
    );

    let fixture = join_fixture(vec!["name".into(), "tier".into()]);
    let schema = SchemaMetadata::new(fixture.tables.clone()).unwrap();
    let factory = EstimatorFactory::new(CostConfig::default()).unwrap();
    let patterns = vec![doc, join];
    let estimates = factory.estimate_all(
        &patterns,
        &schema,
        &fixture.workload,
        AnalysisWindow::full_day(),
    );
    assert_eq!(estimates.len(), 2);

    let scorer = PriorityScorer::new(ScoringWeights::balanced());
    let scored = scorer.rank(
        estimates
            .into_iter()
            .map(|e| {
                let severity = patterns
                    .iter()
                    .find(|p| p.id == e.pattern_id)
                    .map(|p| p.severity)
                    .unwrap_or(Severity::Low);
                (e, severity)
            })
            .collect(),
    );

    let conflicts = ConflictDetector::new().detect(&patterns, &scored);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].resolution, Resolution::DualityView);
    assert_eq!(conflicts[0].overlapping_objects, vec!["orders".to_string()]);
}

// ============================================================================
// Degradation paths
// ============================================================================

#[test]
fn test_failing_sql_generator_degrades_to_placeholder() {
    let workload = WorkloadFeatures::new(vec![QueryPattern::new(
        "u1",
        "UPDATE orders SET payload = :1 WHERE id = :2",
        QueryKind::Update,
        160,
        3.5,
        vec!["orders".into()],
    )]);
    let source = FixtureSource {
        workload,
        tables: vec![orders_with_clob()],
    };

    let advisor = Advisor::new(Box::new(source))
        .unwrap()
        .with_sql_generator(Box::new(FailingGenerator));
    let result = advisor.run(&day_range(), None).unwrap();

    // The run still produces a recommendation with placeholder SQL, and the
    // generation failure is reported.
    assert_eq!(result.recommendation_count(), 1);
    assert!(!result.recommendations[0].implementation.sql.is_empty());
    assert!(result.errors.iter().any(|e| e.contains("SQL generation")));
}

#[test]
fn test_confidence_filter_drops_weak_patterns() {
    let fixture = join_fixture(vec!["name".into(), "tier".into()]);
    // The join fires at confidence 0.8; a 0.9 floor must drop it.
    let config = PipelineConfig::default()
        .with_min_confidence(0.9)
        .with_detectors(DetectorToggles {
            lob_cliff: false,
            storage_model: false,
            duality_view: false,
            ..DetectorToggles::default()
        });
    let advisor = Advisor::with_config(Box::new(fixture), config).unwrap();
    let result = advisor.run(&day_range(), None).unwrap();
    assert_eq!(result.patterns_detected, 0);
    assert!(result.recommendations.is_empty());
}

#[test]
fn test_result_counts_match_list() {
    let fixture = join_fixture(vec!["name".into(), "tier".into()]);
    let advisor = Advisor::new(Box::new(fixture)).unwrap();
    let result = advisor.run(&day_range(), None).unwrap();

    let counted = result.high_priority + result.medium_priority + result.low_priority;
    assert_eq!(counted, result.recommendations.len());
    let total: f64 = result.recommendations.iter().map(|r| r.annual_savings).sum();
    assert!((total - result.total_annual_savings).abs() < 1e-9);
}

#[test]
fn test_report_formats() {
    let fixture = join_fixture(vec!["name".into(), "tier".into()]);
    let advisor = Advisor::new(Box::new(fixture)).unwrap();
    let result = advisor.run(&day_range(), None).unwrap();

    let text = result.render(ReportFormat::Text).unwrap();
    assert!(text.contains("Schema advisory report"));

    let json = result.render(ReportFormat::Json).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(parsed["recommendations"].is_array());
}
