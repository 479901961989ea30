//! Treatment Prioritization
//!
//! Ranks risks that still await treatment and suggests the next step for each.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matrix::RiskLevel;
use crate::portfolio::{exposure_order, ScoredRisk};

/// Average effectiveness below which existing controls should be improved
pub const EFFECTIVENESS_TARGET: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// No control addresses the risk yet
    ImplementControls,
    /// Residual exposure is still high or critical
    AdditionalControls,
    /// Controls exist but perform below target
    ImproveEffectiveness,
    Monitor,
}

impl Recommendation {
    pub fn describe(&self) -> &'static str {
        match self {
            Recommendation::ImplementControls => "Implement controls to mitigate this risk",
            Recommendation::AdditionalControls => "Additional controls needed to reduce residual risk",
            Recommendation::ImproveEffectiveness => "Improve effectiveness of existing controls",
            Recommendation::Monitor => "Monitor and maintain current controls",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPriority {
    pub risk_id: Uuid,
    pub title: String,
    pub priority: Priority,
    pub inherent_level: RiskLevel,
    pub residual_level: RiskLevel,
    pub residual_score: u32,
    pub control_count: usize,
    pub avg_effectiveness: f64,
    pub recommendation: Recommendation,
}

fn priority_for(residual_level: RiskLevel, control_count: usize) -> Priority {
    match residual_level {
        RiskLevel::High | RiskLevel::Critical => Priority::Critical,
        RiskLevel::Medium if control_count < 2 => Priority::High,
        _ if control_count == 0 => Priority::High,
        _ => Priority::Medium,
    }
}

fn recommendation_for(residual_level: RiskLevel, control_count: usize, avg_effectiveness: f64) -> Recommendation {
    if control_count == 0 {
        Recommendation::ImplementControls
    } else if residual_level >= RiskLevel::High {
        Recommendation::AdditionalControls
    } else if avg_effectiveness < EFFECTIVENESS_TARGET {
        Recommendation::ImproveEffectiveness
    } else {
        Recommendation::Monitor
    }
}

/// Prioritized treatment list, at most `limit` entries
pub fn prioritize(population: &[ScoredRisk<'_>], limit: usize) -> Vec<TreatmentPriority> {
    let mut ranked: Vec<_> = population
        .iter()
        .filter(|s| s.risk.status.needs_treatment())
        .map(|s| {
            let residual = s.residual;
            let priority = priority_for(residual.residual_level, residual.control_count);
            (priority, s)
        })
        .collect();

    ranked.sort_by(|(pa, a), (pb, b)| pa.cmp(pb).then_with(|| exposure_order(a, b)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(priority, s)| TreatmentPriority {
            risk_id: s.risk.id,
            title: s.risk.title.clone(),
            priority,
            inherent_level: s.inherent_level,
            residual_level: s.residual.residual_level,
            residual_score: s.residual.residual_score,
            control_count: s.residual.control_count,
            avg_effectiveness: s.residual.avg_effectiveness,
            recommendation: recommendation_for(
                s.residual.residual_level,
                s.residual.control_count,
                s.residual.avg_effectiveness,
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AssessmentLedger;
    use crate::matrix::RiskMatrix;
    use crate::portfolio::{scored_population, PortfolioScope};
    use crate::residual::aggregate_all;
    use crate::risk::{Risk, RiskStatus};
    use chrono::Utc;

    #[test]
    fn test_priority_rules() {
        assert_eq!(priority_for(RiskLevel::Critical, 3), Priority::Critical);
        assert_eq!(priority_for(RiskLevel::High, 0), Priority::Critical);
        assert_eq!(priority_for(RiskLevel::Medium, 1), Priority::High);
        assert_eq!(priority_for(RiskLevel::Medium, 2), Priority::Medium);
        assert_eq!(priority_for(RiskLevel::Low, 0), Priority::High);
        assert_eq!(priority_for(RiskLevel::Low, 1), Priority::Medium);
    }

    #[test]
    fn test_recommendation_rules() {
        assert_eq!(recommendation_for(RiskLevel::Critical, 0, 0.0), Recommendation::ImplementControls);
        assert_eq!(recommendation_for(RiskLevel::High, 2, 95.0), Recommendation::AdditionalControls);
        assert_eq!(recommendation_for(RiskLevel::Low, 1, 50.0), Recommendation::ImproveEffectiveness);
        assert_eq!(recommendation_for(RiskLevel::Low, 1, 70.0), Recommendation::Monitor);
    }

    #[test]
    fn test_prioritize_filters_and_sorts() {
        let matrix = RiskMatrix::default_5x5();
        let mut risks = vec![
            Risk::new("Low and controlled", "ops", 2, 2),
            Risk::new("Critical", "security", 5, 5),
            Risk::new("Monitoring", "security", 5, 5),
            Risk::new("Untreated low", "ops", 1, 2),
        ];
        for (i, r) in risks.iter_mut().enumerate() {
            r.id = Uuid::from_u128(i as u128 + 1);
        }
        risks[2].status = RiskStatus::Monitoring;

        let mut ledger = AssessmentLedger::new();
        ledger.record(Uuid::from_u128(1), Uuid::from_u128(10), 80, Utc::now(), "").unwrap();
        ledger.record(Uuid::from_u128(1), Uuid::from_u128(11), 90, Utc::now(), "").unwrap();

        let residuals = aggregate_all(&risks, &ledger, &matrix);
        let population = scored_population(&risks, &residuals, &matrix, &PortfolioScope::all());
        let list = prioritize(&population, 20);

        let ids: Vec<u128> = list.iter().map(|p| p.risk_id.as_u128()).collect();
        assert_eq!(ids, vec![2, 4, 1]);
        assert_eq!(list[0].priority, Priority::Critical);
        assert_eq!(list[0].recommendation, Recommendation::ImplementControls);
        assert_eq!(list[2].priority, Priority::Medium);
        assert_eq!(list[2].recommendation, Recommendation::Monitor);

        assert_eq!(prioritize(&population, 1).len(), 1);
    }
}
