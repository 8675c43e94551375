//! Recommendation synthesis.
//!
//! Turns an approved pattern, its scored estimate, its tradeoff verdict and
//! any conflicts into the terminal `SchemaRecommendation` artifact. SQL text
//! comes from the optional external generator; when it is absent or fails,
//! a deterministic placeholder DDL skeleton stands in.

use serde::{Deserialize, Serialize};

use crate::conflict::{OptimizationConflict, Resolution};
use crate::error::Result;
use crate::pattern::{DetectedPattern, PatternType};
use crate::schema::TableMetadata;
use crate::scoring::{PriorityTier, ScoredEstimate};
use crate::tradeoff::{TradeoffAnalysis, Verdict};
use crate::workload::WorkloadFeatures;

/// Output of the external SQL generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSql {
    /// Implementation DDL/DML
    pub sql: String,
    /// Rollback statement(s)
    pub rollback_sql: String,
    /// Testing plan steps
    pub test_plan: Vec<String>,
    /// Free-text reasoning from the generator
    pub reasoning: String,
}

/// External SQL generation seam. Implementations may call out to an LLM;
/// the pipeline tolerates absence and failure by falling back to
/// placeholder templates.
pub trait SqlGenerator {
    fn generate(
        &self,
        pattern: &DetectedPattern,
        table: &TableMetadata,
        workload: &WorkloadFeatures,
    ) -> Result<GeneratedSql>;
}

/// Deterministic generator producing the placeholder templates directly.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderSqlGenerator;

impl SqlGenerator for PlaceholderSqlGenerator {
    fn generate(
        &self,
        pattern: &DetectedPattern,
        _table: &TableMetadata,
        _workload: &WorkloadFeatures,
    ) -> Result<GeneratedSql> {
        Ok(placeholder_sql(pattern))
    }
}

/// Category of schema change a recommendation proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationKind {
    LobSplit,
    Denormalization,
    DocumentMigration,
    RelationalMigration,
    DualityView,
}

impl RecommendationKind {
    fn for_pattern(pattern_type: PatternType) -> Self {
        match pattern_type {
            PatternType::LobCliff => RecommendationKind::LobSplit,
            PatternType::ExpensiveJoin => RecommendationKind::Denormalization,
            PatternType::DocumentCandidate => RecommendationKind::DocumentMigration,
            PatternType::RelationalCandidate => RecommendationKind::RelationalMigration,
            PatternType::DualityViewOpportunity => RecommendationKind::DualityView,
        }
    }
}

impl std::fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationKind::LobSplit => write!(f, "LOB_SPLIT"),
            RecommendationKind::Denormalization => write!(f, "DENORMALIZATION"),
            RecommendationKind::DocumentMigration => write!(f, "DOCUMENT_MIGRATION"),
            RecommendationKind::RelationalMigration => write!(f, "RELATIONAL_MIGRATION"),
            RecommendationKind::DualityView => write!(f, "DUALITY_VIEW"),
        }
    }
}

/// SQL, rollback, and verification steps for one recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplementationPlan {
    pub sql: String,
    pub rollback_sql: String,
    pub test_plan: Vec<String>,
}

/// An alternative approach with its own tradeoffs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    pub title: String,
    pub description: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// Terminal advisory artifact. Created once; never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRecommendation {
    /// Sequential identifier within one synthesis pass
    pub id: String,
    /// Source pattern
    pub pattern_id: String,
    /// Category of change
    pub kind: RecommendationKind,
    /// Priority tier from the scorer
    pub priority_tier: PriorityTier,
    /// Composite priority score
    pub priority_score: f64,
    /// Objects the change touches
    pub target_objects: Vec<String>,
    /// Short description of the finding
    pub description: String,
    /// Narrative: pattern, cost, expected benefit
    pub rationale: String,
    /// How to implement and roll back
    pub implementation: ImplementationPlan,
    /// Expected daily cost reduction, percent
    pub estimated_improvement_pct: f64,
    /// One-time implementation cost
    pub implementation_cost: f64,
    /// Expected annual savings
    pub annual_savings: f64,
    /// First-year return on investment, percent
    pub roi_percentage: f64,
    /// Known costs of proceeding
    pub tradeoffs: Vec<String>,
    /// Other viable approaches
    pub alternatives: Vec<Alternative>,
}

/// Builds recommendations from the upstream stage outputs.
#[derive(Debug, Default)]
pub struct RecommendationSynthesizer {
    next_seq: u32,
}

impl RecommendationSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesize one recommendation. Returns `None` when the verdict is
    /// REJECT or no cost estimate is available.
    pub fn synthesize(
        &mut self,
        pattern: &DetectedPattern,
        scored: Option<&ScoredEstimate>,
        tradeoff: Option<&TradeoffAnalysis>,
        conflicts: &[OptimizationConflict],
        generated: Option<&GeneratedSql>,
    ) -> Option<SchemaRecommendation> {
        let scored = scored?;
        if matches!(tradeoff.map(|t| t.verdict), Some(Verdict::Reject)) {
            return None;
        }

        self.next_seq += 1;
        let id = format!("OPT-{:03}", self.next_seq);
        let estimate = &scored.estimate;
        let kind = RecommendationKind::for_pattern(pattern.pattern_type);

        let rationale = rationale_for(pattern, scored);
        let implementation = match generated {
            Some(gen) => ImplementationPlan {
                sql: gen.sql.clone(),
                rollback_sql: gen.rollback_sql.clone(),
                test_plan: gen.test_plan.clone(),
            },
            None => {
                let placeholder = placeholder_sql(pattern);
                ImplementationPlan {
                    sql: placeholder.sql,
                    rollback_sql: placeholder.rollback_sql,
                    test_plan: placeholder.test_plan,
                }
            }
        };

        let mut tradeoffs = Vec::new();
        if let Some(analysis) = tradeoff {
            if analysis.weighted_degradation_pct > 0.0 {
                tradeoffs.push(format!(
                    "Queries outside the optimized path degrade by an estimated {:.1}% \
                     (frequency-weighted)",
                    analysis.weighted_degradation_pct
                ));
            }
        }
        if estimate.implementation_cost > 0.0 {
            let payback = match estimate.payback_days {
                Some(days) => format!("{:.0} days", days),
                None => "not reached at current savings".to_string(),
            };
            tradeoffs.push(format!(
                "One-time implementation cost of ${:.0}; payback {} at {:.0}% first-year ROI",
                estimate.implementation_cost, payback, estimate.roi_percentage
            ));
        }
        for conflict in conflicts.iter().filter(|c| c.involves(&pattern.id)) {
            if matches!(
                conflict.resolution,
                Resolution::PrioritizeA | Resolution::PrioritizeB
            ) {
                let other = if conflict.pattern_a == pattern.id {
                    &conflict.pattern_b
                } else {
                    &conflict.pattern_a
                };
                tradeoffs.push(format!(
                    "Incompatible with {} on {}; apply only the higher-priority change",
                    other,
                    conflict.overlapping_objects.join(", ")
                ));
            }
        }

        let mut alternatives = Vec::new();
        if conflicts
            .iter()
            .any(|c| c.involves(&pattern.id) && c.resolution == Resolution::DualityView)
        {
            alternatives.push(Alternative {
                title: "Duality view over the shared table".to_string(),
                description: "Expose the table as both rows and documents instead of \
                              committing to either layout"
                    .to_string(),
                pros: vec![
                    "Serves both conflicting access shapes from one store".to_string(),
                    "No destructive migration".to_string(),
                ],
                cons: vec![
                    "Requires duality view support in the target database".to_string(),
                    "View maintenance adds write overhead".to_string(),
                ],
            });
        }
        alternatives.push(type_alternative(pattern.pattern_type));

        Some(SchemaRecommendation {
            id,
            pattern_id: pattern.id.clone(),
            kind,
            priority_tier: scored.priority_tier,
            priority_score: scored.priority_score,
            target_objects: pattern.affected_objects.clone(),
            description: pattern.description.clone(),
            rationale,
            implementation,
            estimated_improvement_pct: estimate.improvement_pct(),
            implementation_cost: estimate.implementation_cost,
            annual_savings: estimate.annual_savings,
            roi_percentage: estimate.roi_percentage,
            tradeoffs,
            alternatives,
        })
    }

    /// Synthesize over many patterns and sort by priority tier, highest
    /// first. Patterns lacking both an estimate and a tradeoff analysis are
    /// skipped.
    #[allow(clippy::too_many_arguments)]
    pub fn synthesize_all(
        &mut self,
        patterns: &[DetectedPattern],
        scored: &[ScoredEstimate],
        tradeoffs: &[TradeoffAnalysis],
        conflicts: &[OptimizationConflict],
        generated: &[(String, GeneratedSql)],
    ) -> Vec<SchemaRecommendation> {
        let mut recommendations = Vec::new();
        for pattern in patterns {
            let scored_entry = scored.iter().find(|s| s.estimate.pattern_id == pattern.id);
            let tradeoff_entry = tradeoffs.iter().find(|t| t.pattern_id == pattern.id);
            if scored_entry.is_none() && tradeoff_entry.is_none() {
                continue;
            }
            let generated_entry = generated
                .iter()
                .find(|(id, _)| *id == pattern.id)
                .map(|(_, g)| g);
            if let Some(recommendation) =
                self.synthesize(pattern, scored_entry, tradeoff_entry, conflicts, generated_entry)
            {
                recommendations.push(recommendation);
            }
        }
        recommendations.sort_by(|a, b| b.priority_tier.cmp(&a.priority_tier));
        recommendations
    }
}

fn rationale_for(pattern: &DetectedPattern, scored: &ScoredEstimate) -> String {
    let estimate = &scored.estimate;
    let benefit = format!(
        "expected to cut daily cost by {:.1}% (${:.2}/day, ${:.0}/year)",
        estimate.improvement_pct(),
        estimate.daily_savings,
        estimate.annual_savings
    );
    match pattern.pattern_type {
        PatternType::LobCliff => format!(
            "{}. Each update currently rewrites the whole document at ${:.2}/day; \
             splitting the hot portion is {}.",
            pattern.description, estimate.current_cost_per_day, benefit
        ),
        PatternType::ExpensiveJoin => format!(
            "{}. The repeated dimension lookup costs ${:.2}/day; denormalizing the \
             fetched columns is {}.",
            pattern.description, estimate.current_cost_per_day, benefit
        ),
        PatternType::DocumentCandidate => format!(
            "{}. Assembling the object from rows costs ${:.2}/day; storing it as a \
             document is {}.",
            pattern.description, estimate.current_cost_per_day, benefit
        ),
        PatternType::RelationalCandidate => format!(
            "{}. Scanning whole documents for analytics costs ${:.2}/day; shredding \
             into typed columns is {}.",
            pattern.description, estimate.current_cost_per_day, benefit
        ),
        PatternType::DualityViewOpportunity => format!(
            "{}. App-side shape conversion costs ${:.2}/day; a duality view is {}.",
            pattern.description, estimate.current_cost_per_day, benefit
        ),
    }
}

/// Deterministic DDL skeleton per pattern type.
pub fn placeholder_sql(pattern: &DetectedPattern) -> GeneratedSql {
    let object = pattern
        .affected_objects
        .first()
        .cloned()
        .unwrap_or_default();
    let table = pattern.primary_table().unwrap_or_default();

    let (sql, rollback_sql) = match pattern.pattern_type {
        PatternType::LobCliff => (
            format!(
                "-- Split hot LOB column {obj} into a side table\n\
                 CREATE TABLE {t}_lob AS SELECT id, {col} FROM {t};\n\
                 ALTER TABLE {t} DROP COLUMN {col};",
                obj = object,
                t = table,
                col = object.split('.').nth(1).unwrap_or("payload"),
            ),
            format!(
                "ALTER TABLE {t} ADD COLUMN restored_lob CLOB;\n\
                 -- repopulate from {t}_lob, then DROP TABLE {t}_lob;",
                t = table
            ),
        ),
        PatternType::ExpensiveJoin => (
            format!(
                "-- Denormalize dimension columns into {t}\n\
                 ALTER TABLE {t} ADD (/* denormalized columns */);\n\
                 -- backfill from the dimension table, then add a maintenance trigger",
                t = table
            ),
            format!("ALTER TABLE {t} DROP (/* denormalized columns */);", t = table),
        ),
        PatternType::DocumentCandidate => (
            format!(
                "-- Migrate {t} to a document layout\n\
                 CREATE TABLE {t}_doc (id NUMBER PRIMARY KEY, doc JSON);\n\
                 INSERT INTO {t}_doc SELECT id, JSON_OBJECT(*) FROM {t};",
                t = table
            ),
            format!("DROP TABLE {t}_doc;", t = table),
        ),
        PatternType::RelationalCandidate => (
            format!(
                "-- Shred document columns of {t} into typed columns\n\
                 ALTER TABLE {t} ADD (/* extracted columns */);\n\
                 -- populate via JSON_VALUE extraction",
                t = table
            ),
            format!("ALTER TABLE {t} DROP (/* extracted columns */);", t = table),
        ),
        PatternType::DualityViewOpportunity => (
            format!(
                "CREATE JSON RELATIONAL DUALITY VIEW {t}_dv AS\n\
                 SELECT JSON {{'id': id /* remaining columns */}} FROM {t};",
                t = table
            ),
            format!("DROP VIEW {t}_dv;", t = table),
        ),
    };

    GeneratedSql {
        sql,
        rollback_sql,
        test_plan: vec![
            "Apply the change in a staging copy of the schema".to_string(),
            format!("Replay the captured workload against {}", table),
            "Compare per-query latency and plan shape before/after".to_string(),
            "Verify rollback restores the original layout".to_string(),
        ],
        reasoning: String::from("placeholder template"),
    }
}

fn type_alternative(pattern_type: PatternType) -> Alternative {
    match pattern_type {
        PatternType::LobCliff => Alternative {
            title: "Convert the column to binary-encoded storage in place".to_string(),
            description: "Keep the layout but switch the LOB encoding so partial \
                          updates stop rewriting the full text image"
                .to_string(),
            pros: vec!["No application changes".to_string(), "Fast to apply".to_string()],
            cons: vec!["Keeps some write amplification".to_string()],
        },
        PatternType::ExpensiveJoin => Alternative {
            title: "Materialized join view".to_string(),
            description: "Materialize the join result and refresh on commit instead of \
                          widening the fact table"
                .to_string(),
            pros: vec!["Fact table untouched".to_string()],
            cons: vec![
                "Refresh lag or refresh cost".to_string(),
                "Extra storage for the view".to_string(),
            ],
        },
        PatternType::DocumentCandidate => Alternative {
            title: "Add a JSON column alongside the relational columns".to_string(),
            description: "Introduce the document incrementally instead of migrating the \
                          table wholesale"
                .to_string(),
            pros: vec!["Incremental rollout".to_string()],
            cons: vec!["Dual-write complexity during transition".to_string()],
        },
        PatternType::RelationalCandidate => Alternative {
            title: "Materialized relational projection".to_string(),
            description: "Project the analytic columns into a materialized view and keep \
                          the document authoritative"
                .to_string(),
            pros: vec!["Document writers unaffected".to_string()],
            cons: vec!["Projection must be kept in sync".to_string()],
        },
        PatternType::DualityViewOpportunity => Alternative {
            title: "Dedicated analytics replica".to_string(),
            description: "Route analytic queries to a read replica instead of unifying \
                          shapes in one store"
                .to_string(),
            pros: vec!["Isolates analytic load".to_string()],
            cons: vec![
                "Replica lag".to_string(),
                "Twice the storage and operational surface".to_string(),
            ],
        },
    }
}
