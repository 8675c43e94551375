//! Detected anti-pattern records.
//!
//! A `DetectedPattern` is the unit of currency between the detectors and
//! everything downstream. Construction validates the confidence range so an
//! out-of-range record is unrepresentable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ReforgeError, Result};

/// Severity of a detected pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
        }
    }
}

/// Pattern type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternType {
    /// Frequent small writes to a large out-of-line column
    LobCliff,
    /// High-frequency join against a stable dimension table
    ExpensiveJoin,
    /// Access profile favors a document layout
    DocumentCandidate,
    /// Access profile favors a relational layout
    RelationalCandidate,
    /// Mixed OLTP/analytics traffic suited to a duality view
    DualityViewOpportunity,
}

impl PatternType {
    /// Stable slug used in deterministic pattern identifiers.
    pub fn slug(&self) -> &'static str {
        match self {
            PatternType::LobCliff => "lob_cliff",
            PatternType::ExpensiveJoin => "expensive_join",
            PatternType::DocumentCandidate => "document_candidate",
            PatternType::RelationalCandidate => "relational_candidate",
            PatternType::DualityViewOpportunity => "duality_view_opportunity",
        }
    }
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternType::LobCliff => write!(f, "LOB_CLIFF"),
            PatternType::ExpensiveJoin => write!(f, "EXPENSIVE_JOIN"),
            PatternType::DocumentCandidate => write!(f, "DOCUMENT_CANDIDATE"),
            PatternType::RelationalCandidate => write!(f, "RELATIONAL_CANDIDATE"),
            PatternType::DualityViewOpportunity => write!(f, "DUALITY_VIEW_OPPORTUNITY"),
        }
    }
}

/// A value in the pattern-type-specific metrics map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl MetricValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Integer(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// List view of the value, if it is one.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            MetricValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Integer(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<Vec<String>> for MetricValue {
    fn from(v: Vec<String>) -> Self {
        MetricValue::List(v)
    }
}

/// One detected optimization opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedPattern {
    /// Deterministic identifier, unique within a detection pass
    pub id: String,
    /// Pattern type tag
    pub pattern_type: PatternType,
    /// Severity bucket
    pub severity: Severity,
    /// Detection confidence in [0,1]
    pub confidence: f64,
    /// Affected objects: `TABLE` or `TABLE.COLUMN`
    pub affected_objects: Vec<String>,
    /// Human-readable description
    pub description: String,
    /// Pattern-type-specific metrics
    pub metrics: BTreeMap<String, MetricValue>,
    /// Short hint for the recommendation synthesizer
    pub recommendation_hint: String,
}

impl DetectedPattern {
    /// Create a pattern. The identifier is derived from the type and the
    /// affected objects so identical inputs reproduce identical ids.
    ///
    /// Fails when confidence is outside [0,1] or no object is affected.
    pub fn new(
        pattern_type: PatternType,
        severity: Severity,
        confidence: f64,
        affected_objects: Vec<String>,
        description: impl Into<String>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) || confidence.is_nan() {
            return Err(ReforgeError::pattern(format!(
                "confidence {} outside [0,1]",
                confidence
            )));
        }
        if affected_objects.is_empty() {
            return Err(ReforgeError::pattern(
                "pattern must name at least one affected object",
            ));
        }
        let id = Self::deterministic_id(pattern_type, &affected_objects);
        Ok(Self {
            id,
            pattern_type,
            severity,
            confidence,
            affected_objects,
            description: description.into(),
            metrics: BTreeMap::new(),
            recommendation_hint: String::new(),
        })
    }

    /// Add a metric.
    pub fn with_metric(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }

    /// Set the recommendation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.recommendation_hint = hint.into();
        self
    }

    /// Numeric metric lookup with a caller-supplied fallback.
    pub fn metric_f64(&self, key: &str, default: f64) -> f64 {
        self.metrics
            .get(key)
            .and_then(MetricValue::as_f64)
            .unwrap_or(default)
    }

    /// Tables named by the affected objects (the `TABLE` part of
    /// `TABLE.COLUMN` entries), lowercased, deduplicated, order preserved.
    pub fn affected_tables(&self) -> Vec<String> {
        let mut tables = Vec::new();
        for object in &self.affected_objects {
            let table = object
                .split('.')
                .next()
                .unwrap_or(object.as_str())
                .to_lowercase();
            if !tables.contains(&table) {
                tables.push(table);
            }
        }
        tables
    }

    /// The first affected table, used to resolve metadata for costing.
    pub fn primary_table(&self) -> Option<String> {
        self.affected_tables().into_iter().next()
    }

    fn deterministic_id(pattern_type: PatternType, objects: &[String]) -> String {
        let mut joined = objects
            .iter()
            .map(|o| o.to_lowercase())
            .collect::<Vec<_>>();
        joined.sort();
        format!("{}:{}", pattern_type.slug(), joined.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let high = DetectedPattern::new(
            PatternType::LobCliff,
            Severity::High,
            1.2,
            vec!["orders.payload".into()],
            "x",
        );
        assert!(high.is_err());

        let negative = DetectedPattern::new(
            PatternType::LobCliff,
            Severity::High,
            -0.1,
            vec!["orders.payload".into()],
            "x",
        );
        assert!(negative.is_err());
    }

    #[test]
    fn test_empty_objects_rejected() {
        let result =
            DetectedPattern::new(PatternType::DualityViewOpportunity, Severity::Low, 0.5, vec![], "x");
        assert!(result.is_err());
    }

    #[test]
    fn test_deterministic_id_stable_across_object_order() {
        let a = DetectedPattern::new(
            PatternType::ExpensiveJoin,
            Severity::Medium,
            0.8,
            vec!["orders".into(), "customers".into()],
            "x",
        )
        .unwrap();
        let b = DetectedPattern::new(
            PatternType::ExpensiveJoin,
            Severity::Medium,
            0.8,
            vec!["CUSTOMERS".into(), "orders".into()],
            "x",
        )
        .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, "expensive_join:customers+orders");
    }

    #[test]
    fn test_affected_tables_strips_columns() {
        let pattern = DetectedPattern::new(
            PatternType::LobCliff,
            Severity::High,
            0.9,
            vec!["Orders.payload".into()],
            "x",
        )
        .unwrap();
        assert_eq!(pattern.affected_tables(), vec!["orders".to_string()]);
        assert_eq!(pattern.primary_table(), Some("orders".to_string()));
    }

    #[test]
    fn test_metric_lookup_with_default() {
        let pattern = DetectedPattern::new(
            PatternType::LobCliff,
            Severity::High,
            0.9,
            vec!["orders.payload".into()],
            "x",
        )
        .unwrap()
        .with_metric("updates_per_day", 150.0)
        .with_metric("columns_accessed", vec!["a".to_string(), "b".to_string()]);

        assert!((pattern.metric_f64("updates_per_day", 0.0) - 150.0).abs() < 1e-9);
        assert!((pattern.metric_f64("missing", 7.0) - 7.0).abs() < 1e-9);
        assert_eq!(
            pattern.metrics["columns_accessed"].as_list().map(|l| l.len()),
            Some(2)
        );
    }
}
