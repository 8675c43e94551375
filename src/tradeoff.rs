//! Per-pattern tradeoff analysis.
//!
//! Splits the traffic against a pattern's tables into a benefiting
//! high-frequency set and a potentially degrading low-frequency set, then
//! weighs improvement against degradation to reach a verdict.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pattern::{DetectedPattern, PatternType};
use crate::scoring::ScoredEstimate;
use crate::workload::WorkloadFeatures;

/// Outcome of the benefit/cost analysis for one pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Approve,
    Reject,
    Conditional,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Approve => write!(f, "APPROVE"),
            Verdict::Reject => write!(f, "REJECT"),
            Verdict::Conditional => write!(f, "CONDITIONAL"),
        }
    }
}

/// Frequency-weighted benefit/cost analysis for one pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeoffAnalysis {
    /// Pattern under analysis
    pub pattern_id: String,
    /// Verdict
    pub verdict: Verdict,
    /// Improvement percentage weighted by the benefiting traffic share
    pub weighted_improvement_pct: f64,
    /// Degradation percentage weighted by the degrading traffic share
    pub weighted_degradation_pct: f64,
    /// Net benefit score (improvement − degradation)
    pub net_benefit_score: f64,
    /// Net score a pattern must clear for approval
    pub break_even_threshold: f64,
    /// Conditions attached to a CONDITIONAL verdict
    pub conditions: Vec<String>,
}

/// Analyzer configuration.
#[derive(Debug, Clone)]
pub struct TradeoffConfig {
    /// A query is high-frequency when its share of the affected tables'
    /// executions is at least this fraction.
    pub high_frequency_share: f64,
    /// Net score at or above which the verdict is APPROVE.
    pub break_even_threshold: f64,
    /// Net score below the negated threshold yields REJECT.
    pub reject_threshold: f64,
}

impl Default for TradeoffConfig {
    fn default() -> Self {
        Self {
            high_frequency_share: 0.05,
            break_even_threshold: 5.0,
            reject_threshold: -5.0,
        }
    }
}

/// Per-pattern-type degradation applied to the low-frequency set, percent.
/// Denormalizing layouts slow the traffic they were not shaped for.
fn degradation_pct(pattern_type: PatternType) -> f64 {
    match pattern_type {
        PatternType::ExpensiveJoin => 15.0,
        PatternType::DocumentCandidate => 10.0,
        PatternType::RelationalCandidate => 10.0,
        PatternType::LobCliff => 5.0,
        PatternType::DualityViewOpportunity => 0.0,
    }
}

/// Weighs each optimization's improvement for hot queries against its
/// degradation of cold ones.
#[derive(Debug, Clone, Default)]
pub struct TradeoffAnalyzer {
    config: TradeoffConfig,
}

impl TradeoffAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TradeoffConfig) -> Self {
        Self { config }
    }

    /// Analyze one pattern given its scored estimate.
    pub fn analyze(
        &self,
        pattern: &DetectedPattern,
        scored: &ScoredEstimate,
        workload: &WorkloadFeatures,
    ) -> Result<TradeoffAnalysis> {
        let tables = pattern.affected_tables();
        let mut total = 0.0_f64;
        let mut per_query: Vec<f64> = Vec::new();
        for query in &workload.patterns {
            if tables.iter().any(|t| query.touches(t)) {
                total += query.executions as f64;
                per_query.push(query.executions as f64);
            }
        }

        let mut benefiting = 0.0_f64;
        let mut degrading = 0.0_f64;
        if total > 0.0 {
            for executions in per_query {
                if executions / total >= self.config.high_frequency_share {
                    benefiting += executions;
                } else {
                    degrading += executions;
                }
            }
        }
        let benefiting_share = if total > 0.0 { benefiting / total } else { 0.0 };
        let degrading_share = if total > 0.0 { degrading / total } else { 0.0 };

        let weighted_improvement_pct = scored.estimate.improvement_pct() * benefiting_share;
        let weighted_degradation_pct =
            degradation_pct(pattern.pattern_type) * degrading_share;
        let net = weighted_improvement_pct - weighted_degradation_pct;

        let (verdict, conditions) = if net >= self.config.break_even_threshold {
            (Verdict::Approve, Vec::new())
        } else if net < self.config.reject_threshold {
            (Verdict::Reject, Vec::new())
        } else {
            let mut conditions = vec![format!(
                "Net benefit score {:.1} is below the break-even threshold {:.1}; \
                 validate against a production-shaped workload first",
                net, self.config.break_even_threshold
            )];
            if weighted_degradation_pct > 0.0 {
                conditions.push(format!(
                    "Monitor the {:.0}% of traffic outside the optimized path for \
                     the expected ~{:.1}% slowdown",
                    degrading_share * 100.0,
                    weighted_degradation_pct
                ));
            }
            (Verdict::Conditional, conditions)
        };

        Ok(TradeoffAnalysis {
            pattern_id: pattern.id.clone(),
            verdict,
            weighted_improvement_pct,
            weighted_degradation_pct,
            net_benefit_score: net,
            break_even_threshold: self.config.break_even_threshold,
            conditions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CostBreakdown, CostEstimate};
    use crate::pattern::Severity;
    use crate::scoring::{PriorityScorer, ScoringWeights};
    use crate::workload::{QueryKind, QueryPattern};

    fn pattern() -> DetectedPattern {
        DetectedPattern::new(
            PatternType::ExpensiveJoin,
            Severity::Medium,
            0.8,
            vec!["orders".into(), "customers".into()],
            "x",
        )
        .unwrap()
    }

    fn scored(daily_current: f64, daily_optimized: f64) -> ScoredEstimate {
        let estimate = CostEstimate::new(
            "expensive_join:customers+orders",
            PatternType::ExpensiveJoin,
            CostBreakdown::new().with_read(daily_current),
            CostBreakdown::new().with_read(daily_optimized),
            5_000.0,
            vec![],
        );
        PriorityScorer::new(ScoringWeights::balanced()).score(estimate, Severity::Medium)
    }

    fn hot_workload() -> WorkloadFeatures {
        WorkloadFeatures::new(vec![
            QueryPattern::new(
                "hot",
                "SELECT ...",
                QueryKind::Select,
                9_500,
                1.0,
                vec!["orders".into()],
            ),
            QueryPattern::new(
                "cold",
                "SELECT ...",
                QueryKind::Select,
                400,
                1.0,
                vec!["orders".into()],
            ),
            QueryPattern::new(
                "elsewhere",
                "SELECT ...",
                QueryKind::Select,
                50_000,
                1.0,
                vec!["inventory".into()],
            ),
        ])
    }

    #[test]
    fn test_dominant_improvement_approved() {
        let analysis = TradeoffAnalyzer::new()
            .analyze(&pattern(), &scored(100.0, 30.0), &hot_workload())
            .unwrap();
        // 70% improvement on ~96% of traffic vs 15% degradation on ~4%.
        assert_eq!(analysis.verdict, Verdict::Approve);
        assert!(analysis.weighted_improvement_pct > 60.0);
        assert!(analysis.weighted_degradation_pct < 1.0);
        assert!(analysis.conditions.is_empty());
    }

    #[test]
    fn test_marginal_improvement_conditional() {
        // 5% improvement across hot traffic barely clears zero after
        // degradation; verdict falls into the conditional band.
        let analysis = TradeoffAnalyzer::new()
            .analyze(&pattern(), &scored(100.0, 95.0), &hot_workload())
            .unwrap();
        assert_eq!(analysis.verdict, Verdict::Conditional);
        assert!(!analysis.conditions.is_empty());
    }

    #[test]
    fn test_cost_increase_rejected() {
        // The "optimization" raises daily cost: improvement is zero and the
        // degradation share decides.
        let all_cold = WorkloadFeatures::new(
            (0..40)
                .map(|i| {
                    QueryPattern::new(
                        format!("q{}", i),
                        "SELECT ...",
                        QueryKind::Select,
                        100,
                        1.0,
                        vec!["orders".into()],
                    )
                })
                .collect(),
        );
        let analysis = TradeoffAnalyzer::new()
            .analyze(&pattern(), &scored(100.0, 130.0), &all_cold)
            .unwrap();
        assert_eq!(analysis.verdict, Verdict::Reject);
        assert!(analysis.net_benefit_score < -5.0);
    }

    #[test]
    fn test_no_traffic_is_conditional() {
        let analysis = TradeoffAnalyzer::new()
            .analyze(&pattern(), &scored(100.0, 30.0), &WorkloadFeatures::empty())
            .unwrap();
        // Nothing to weigh either way: net 0 sits between the thresholds.
        assert_eq!(analysis.verdict, Verdict::Conditional);
        assert_eq!(analysis.net_benefit_score, 0.0);
    }

    #[test]
    fn test_duality_view_has_no_degradation() {
        assert_eq!(degradation_pct(PatternType::DualityViewOpportunity), 0.0);
        assert!(degradation_pct(PatternType::ExpensiveJoin) > 0.0);
    }
}
