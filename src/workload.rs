//! Workload model: normalized query patterns and per-run aggregates.
//!
//! `QueryPattern` records are produced by the external collector/compressor
//! and are immutable for the duration of a pipeline run. Statement shape
//! classification (whole-row fetches, aggregate usage, updated-column
//! counts) is derived on demand with sqlparser, falling back to normalized
//! text heuristics when the dialect defeats the parser.

use serde::{Deserialize, Serialize};
use sqlparser::ast::{SelectItem, SetExpr, Statement};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser as SqlParser;

/// Statement type of a normalized query pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKind::Select => write!(f, "SELECT"),
            QueryKind::Insert => write!(f, "INSERT"),
            QueryKind::Update => write!(f, "UPDATE"),
            QueryKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// Join flavor recorded by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

/// One join edge observed in a query pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinInfo {
    /// Left (driving/fact) table
    pub left_table: String,
    /// Right (dimension) table
    pub right_table: String,
    /// Columns fetched from the right table
    pub fetched_columns: Vec<String>,
    /// Join flavor
    pub kind: JoinKind,
}

impl JoinInfo {
    pub fn new(
        left_table: impl Into<String>,
        right_table: impl Into<String>,
        fetched_columns: Vec<String>,
        kind: JoinKind,
    ) -> Self {
        Self {
            left_table: left_table.into(),
            right_table: right_table.into(),
            fetched_columns,
            kind,
        }
    }
}

/// One normalized query shape with its execution statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPattern {
    /// Collector-assigned identifier
    pub id: String,
    /// Normalized statement text
    pub statement: String,
    /// Statement type
    pub kind: QueryKind,
    /// Executions observed in the snapshot window
    pub executions: u64,
    /// Average latency per execution in milliseconds
    pub avg_latency_ms: f64,
    /// Tables referenced by the statement
    pub tables: Vec<String>,
    /// Number of join edges
    pub join_count: usize,
    /// Join edges with fetched-column detail
    pub joins: Vec<JoinInfo>,
}

impl QueryPattern {
    /// Create a pattern with no joins; use `with_joins` for join detail.
    pub fn new(
        id: impl Into<String>,
        statement: impl Into<String>,
        kind: QueryKind,
        executions: u64,
        avg_latency_ms: f64,
        tables: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            statement: statement.into(),
            kind,
            executions,
            avg_latency_ms,
            tables,
            join_count: 0,
            joins: Vec::new(),
        }
    }

    /// Attach join detail.
    pub fn with_joins(mut self, joins: Vec<JoinInfo>) -> Self {
        self.join_count = joins.len();
        self.joins = joins;
        self
    }

    /// Whether this pattern references the given table.
    pub fn touches(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t.eq_ignore_ascii_case(table))
    }

    /// Derive the statement shape used by the detectors.
    pub fn shape(&self) -> QueryShape {
        QueryShape::of(&self.statement, self.kind)
    }
}

/// Structural features of a statement relevant to pattern detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryShape {
    /// SELECT * (or qualified wildcard) projection
    pub whole_row_fetch: bool,
    /// Uses an aggregate function or GROUP BY
    pub has_aggregate: bool,
    /// Number of columns assigned by an UPDATE (0 for other kinds)
    pub updated_columns: usize,
}

const AGGREGATE_MARKERS: [&str; 6] = ["COUNT(", "SUM(", "AVG(", "MIN(", "MAX(", "GROUP BY"];

impl QueryShape {
    /// Classify a statement. Parsing failures degrade to text heuristics so
    /// a collector feeding vendor-specific SQL never stops detection.
    pub fn of(statement: &str, kind: QueryKind) -> Self {
        let normalized = statement.to_uppercase();
        let has_aggregate =
            kind == QueryKind::Select && AGGREGATE_MARKERS.iter().any(|m| normalized.contains(m));

        match Self::parse_first(statement) {
            Some(Statement::Query(query)) => {
                let whole_row = match query.body.as_ref() {
                    SetExpr::Select(select) => select.projection.iter().any(|item| {
                        matches!(
                            item,
                            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(_, _)
                        )
                    }),
                    _ => false,
                };
                Self {
                    whole_row_fetch: whole_row,
                    has_aggregate,
                    updated_columns: 0,
                }
            }
            Some(Statement::Update { assignments, .. }) => Self {
                whole_row_fetch: false,
                has_aggregate: false,
                updated_columns: assignments.len(),
            },
            _ => Self::from_text(&normalized, kind, has_aggregate),
        }
    }

    fn parse_first(statement: &str) -> Option<Statement> {
        let mut parsed = SqlParser::parse_sql(&GenericDialect {}, statement).ok()?;
        if parsed.is_empty() {
            None
        } else {
            Some(parsed.remove(0))
        }
    }

    /// Text fallback in the style of the rule-based advisor heuristics.
    fn from_text(normalized: &str, kind: QueryKind, has_aggregate: bool) -> Self {
        let whole_row = kind == QueryKind::Select
            && (normalized.contains("SELECT *") || normalized.contains("SELECT  *"));

        let updated_columns = if kind == QueryKind::Update {
            Self::count_set_columns(normalized)
        } else {
            0
        };

        Self {
            whole_row_fetch: whole_row,
            has_aggregate,
            updated_columns,
        }
    }

    fn count_set_columns(normalized: &str) -> usize {
        let Some(start) = normalized.find(" SET ") else {
            return 0;
        };
        let rest = &normalized[start + 5..];
        let end = rest.find(" WHERE ").unwrap_or(rest.len());
        rest[..end].split(',').filter(|s| !s.trim().is_empty()).count()
    }
}

/// The analysis window: how long the workload snapshot covers. Detectors
/// and estimators normalize observed counts to per-day rates through it so
/// sub-daily collection windows do not suppress detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisWindow {
    hours: f64,
}

impl AnalysisWindow {
    /// Create a window of the given duration. Non-positive durations are
    /// coerced to a full day.
    pub fn hours(hours: f64) -> Self {
        Self {
            hours: if hours > 0.0 { hours } else { 24.0 },
        }
    }

    /// A full 24-hour window.
    pub fn full_day() -> Self {
        Self { hours: 24.0 }
    }

    /// Normalize a count observed over the window to a per-day rate.
    pub fn per_day(&self, count: f64) -> f64 {
        count * 24.0 / self.hours
    }
}

impl Default for AnalysisWindow {
    fn default() -> Self {
        Self::full_day()
    }
}

/// Ordered collection of query patterns for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadFeatures {
    /// Normalized patterns, collector order preserved
    pub patterns: Vec<QueryPattern>,
    /// Sum of executions across patterns
    pub total_executions: u64,
    /// Number of distinct patterns
    pub distinct_patterns: usize,
}

impl WorkloadFeatures {
    /// Build aggregates from a pattern list.
    pub fn new(patterns: Vec<QueryPattern>) -> Self {
        let total_executions = patterns.iter().map(|p| p.executions).sum();
        let distinct_patterns = patterns.len();
        Self {
            patterns,
            total_executions,
            distinct_patterns,
        }
    }

    /// An empty workload.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Patterns referencing the given table.
    pub fn patterns_for_table<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = &'a QueryPattern> {
        self.patterns.iter().filter(move |p| p.touches(table))
    }

    /// Total executions against the given table.
    pub fn executions_for_table(&self, table: &str) -> u64 {
        self.patterns_for_table(table).map(|p| p.executions).sum()
    }

    /// Merge patterns with identical statement text: executions are summed
    /// and latency re-averaged by execution weight. Used when workload
    /// compression is enabled and the upstream compressor was bypassed.
    pub fn compressed(&self) -> Self {
        let mut merged: Vec<QueryPattern> = Vec::new();
        for pattern in &self.patterns {
            if let Some(existing) = merged.iter_mut().find(|m| m.statement == pattern.statement) {
                let total = existing.executions + pattern.executions;
                if total > 0 {
                    existing.avg_latency_ms = (existing.avg_latency_ms
                        * existing.executions as f64
                        + pattern.avg_latency_ms * pattern.executions as f64)
                        / total as f64;
                }
                existing.executions = total;
            } else {
                merged.push(pattern.clone());
            }
        }
        Self::new(merged)
    }

    /// Keep only the `cap` most-executed patterns. Applied before any
    /// statement parsing to bound analysis cost.
    pub fn capped(&self, cap: usize) -> Self {
        if self.patterns.len() <= cap {
            return self.clone();
        }
        let mut sorted = self.patterns.clone();
        sorted.sort_by(|a, b| b.executions.cmp(&a.executions));
        sorted.truncate(cap);
        Self::new(sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_row_fetch_detected() {
        let shape = QueryShape::of("SELECT * FROM orders WHERE id = 1", QueryKind::Select);
        assert!(shape.whole_row_fetch);
        assert!(!shape.has_aggregate);
    }

    #[test]
    fn test_projected_select_is_not_whole_row() {
        let shape = QueryShape::of("SELECT id, name FROM orders", QueryKind::Select);
        assert!(!shape.whole_row_fetch);
    }

    #[test]
    fn test_aggregate_detected() {
        let shape = QueryShape::of(
            "SELECT region, SUM(amount) FROM orders GROUP BY region",
            QueryKind::Select,
        );
        assert!(shape.has_aggregate);
    }

    #[test]
    fn test_update_column_count() {
        let shape = QueryShape::of(
            "UPDATE orders SET status = 'shipped', updated_at = now(), carrier = 'x' WHERE id = 1",
            QueryKind::Update,
        );
        assert_eq!(shape.updated_columns, 3);
    }

    #[test]
    fn test_update_column_count_text_fallback() {
        // Vendor hint syntax defeats the parser; the text path still counts.
        let shape = QueryShape::of(
            "UPDATE /*+ INDEX(o) */ orders SET a = 1, b = 2 WHERE id = 1",
            QueryKind::Update,
        );
        assert_eq!(shape.updated_columns, 2);
    }

    #[test]
    fn test_window_normalization() {
        let six_hours = AnalysisWindow::hours(6.0);
        assert!((six_hours.per_day(25.0) - 100.0).abs() < 1e-9);
        let full = AnalysisWindow::full_day();
        assert!((full.per_day(150.0) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_workload_aggregates() {
        let workload = WorkloadFeatures::new(vec![
            QueryPattern::new("q1", "SELECT * FROM a", QueryKind::Select, 10, 1.0, vec![
                "a".into(),
            ]),
            QueryPattern::new("q2", "SELECT * FROM b", QueryKind::Select, 5, 1.0, vec![
                "b".into(),
            ]),
        ]);
        assert_eq!(workload.total_executions, 15);
        assert_eq!(workload.distinct_patterns, 2);
        assert_eq!(workload.executions_for_table("a"), 10);
    }

    #[test]
    fn test_compression_merges_identical_statements() {
        let workload = WorkloadFeatures::new(vec![
            QueryPattern::new("q1", "SELECT * FROM a", QueryKind::Select, 10, 2.0, vec![
                "a".into(),
            ]),
            QueryPattern::new("q2", "SELECT * FROM a", QueryKind::Select, 30, 4.0, vec![
                "a".into(),
            ]),
        ]);
        let compressed = workload.compressed();
        assert_eq!(compressed.distinct_patterns, 1);
        assert_eq!(compressed.total_executions, 40);
        // Execution-weighted latency: (10*2 + 30*4) / 40 = 3.5
        assert!((compressed.patterns[0].avg_latency_ms - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_cap_keeps_most_executed() {
        let workload = WorkloadFeatures::new(vec![
            QueryPattern::new("q1", "A", QueryKind::Select, 1, 1.0, vec!["a".into()]),
            QueryPattern::new("q2", "B", QueryKind::Select, 100, 1.0, vec!["a".into()]),
            QueryPattern::new("q3", "C", QueryKind::Select, 10, 1.0, vec!["a".into()]),
        ]);
        let capped = workload.capped(2);
        assert_eq!(capped.distinct_patterns, 2);
        assert!(capped.patterns.iter().any(|p| p.id == "q2"));
        assert!(capped.patterns.iter().any(|p| p.id == "q3"));
    }
}
