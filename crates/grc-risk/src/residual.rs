//! Residual Risk Aggregator
//!
//! Folds the current assessments of a risk into one residual figure. The best
//! single control wins: residual score is the minimum over current
//! assessments, so adding a control can never raise exposure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::assessment::{evaluate_assessment, risk_reduction, RiskAssessment};
use crate::error::{RiskError, RiskResult};
use crate::ledger::AssessmentLedger;
use crate::matrix::{RiskLevel, RiskMatrix};
use crate::risk::{inherent_score, Risk};
use crate::round2;

/// Per-risk residual figures (`residual_risk_data`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualRiskSummary {
    pub risk_id: Uuid,
    pub inherent_score: u32,
    pub residual_likelihood: u32,
    pub residual_impact: u32,
    pub residual_score: u32,
    pub residual_level: RiskLevel,
    pub control_count: usize,
    pub avg_effectiveness: f64,
    pub risk_reduction: f64,
}

/// Risk that could not be scored, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRisk {
    pub risk_id: Uuid,
    pub reason: String,
}

impl SkippedRisk {
    pub fn new(risk_id: Uuid, error: &RiskError) -> Self {
        Self {
            risk_id,
            reason: error.to_string(),
        }
    }
}

/// Aggregate the current assessments of one risk
///
/// Assessments that are superseded or belong to another risk are ignored.
pub fn aggregate<'a>(
    risk: &Risk,
    assessments: impl IntoIterator<Item = &'a RiskAssessment>,
    matrix: &RiskMatrix,
) -> RiskResult<ResidualRiskSummary> {
    aggregate_in_force(risk, assessments.into_iter().filter(|a| a.is_current), matrix)
}

/// Aggregate assessments known to be in force, whatever their `is_current`
/// flag says today
pub(crate) fn aggregate_in_force<'a>(
    risk: &Risk,
    assessments: impl IntoIterator<Item = &'a RiskAssessment>,
    matrix: &RiskMatrix,
) -> RiskResult<ResidualRiskSummary> {
    let inherent = inherent_score(risk, matrix)?;

    let mut summary = ResidualRiskSummary {
        risk_id: risk.id,
        inherent_score: inherent,
        residual_likelihood: risk.inherent_likelihood,
        residual_impact: risk.inherent_impact,
        residual_score: inherent,
        residual_level: matrix.classify(inherent),
        control_count: 0,
        avg_effectiveness: 0.0,
        risk_reduction: 0.0,
    };

    let mut effectiveness_total = 0u32;
    let mut best: Option<(u32, u32, u32)> = None;

    for assessment in assessments {
        if assessment.risk_id != risk.id {
            continue;
        }
        let rating = evaluate_assessment(risk, assessment, matrix)?;

        summary.control_count += 1;
        effectiveness_total += assessment.effectiveness_rating;

        if best.map_or(true, |(score, _, _)| rating.residual_score < score) {
            best = Some((rating.residual_score, rating.residual_likelihood, rating.residual_impact));
        }
    }

    if let Some((score, likelihood, impact)) = best {
        summary.residual_score = score;
        summary.residual_likelihood = likelihood;
        summary.residual_impact = impact;
        summary.residual_level = matrix.classify(score);
        summary.avg_effectiveness = round2(effectiveness_total as f64 / summary.control_count as f64);
        summary.risk_reduction = round2(risk_reduction(inherent, score));
    }

    Ok(summary)
}

/// Residual summaries for a whole population
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidualBatch {
    pub summaries: BTreeMap<Uuid, ResidualRiskSummary>,
    pub skipped: Vec<SkippedRisk>,
}

impl ResidualBatch {
    pub fn get(&self, risk_id: &Uuid) -> Option<&ResidualRiskSummary> {
        self.summaries.get(risk_id)
    }
}

/// Aggregate every risk against the ledger's current assessments
///
/// A risk whose ratings are invalid is reported in `skipped`; the rest of the
/// population is still aggregated.
pub fn aggregate_all(risks: &[Risk], ledger: &AssessmentLedger, matrix: &RiskMatrix) -> ResidualBatch {
    let mut batch = ResidualBatch::default();

    for risk in risks {
        match aggregate(risk, ledger.current_for(risk.id), matrix) {
            Ok(summary) => {
                batch.summaries.insert(risk.id, summary);
            }
            Err(e) => {
                tracing::warn!(risk_id = %risk.id, error = %e, "risk skipped during residual aggregation");
                batch.skipped.push(SkippedRisk::new(risk.id, &e));
            }
        }
    }

    tracing::debug!(
        scored = batch.summaries.len(),
        skipped = batch.skipped.len(),
        "residual aggregation complete"
    );
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (RiskMatrix, Risk) {
        let mut risk = Risk::new("Data breach", "security", 4, 4);
        risk.id = Uuid::from_u128(1);
        (RiskMatrix::default_5x5(), risk)
    }

    #[test]
    fn test_no_assessments_residual_equals_inherent() {
        let (matrix, risk) = setup();
        let summary = aggregate(&risk, &[], &matrix).unwrap();

        assert_eq!(summary.residual_score, 16);
        assert_eq!(summary.residual_level, RiskLevel::High);
        assert_eq!(summary.control_count, 0);
        assert_eq!(summary.avg_effectiveness, 0.0);
        assert_eq!(summary.risk_reduction, 0.0);
    }

    #[test]
    fn test_single_assessment() {
        let (matrix, risk) = setup();
        let a = RiskAssessment::new(risk.id, Uuid::from_u128(10), 50);
        let summary = aggregate(&risk, [&a], &matrix).unwrap();

        assert_eq!(summary.residual_score, 8);
        assert_eq!(summary.residual_level, RiskLevel::Medium);
        assert_eq!(summary.risk_reduction, 50.0);
        assert_eq!(summary.avg_effectiveness, 50.0);
    }

    #[test]
    fn test_best_control_wins() {
        let (matrix, risk) = setup();
        let weak = RiskAssessment::new(risk.id, Uuid::from_u128(10), 30);
        let strong = RiskAssessment::new(risk.id, Uuid::from_u128(11), 70);
        let summary = aggregate(&risk, [&weak, &strong], &matrix).unwrap();

        assert_eq!(summary.residual_score, 4);
        assert_eq!(summary.residual_likelihood, 1);
        assert_eq!(summary.residual_impact, 4);
        assert_eq!(summary.residual_level, RiskLevel::Low);
        assert_eq!(summary.control_count, 2);
        assert_eq!(summary.avg_effectiveness, 50.0);
        assert_eq!(summary.risk_reduction, 75.0);
    }

    #[test]
    fn test_ignores_superseded_and_foreign() {
        let (matrix, risk) = setup();
        let mut old = RiskAssessment::new(risk.id, Uuid::from_u128(10), 90);
        old.is_current = false;
        let foreign = RiskAssessment::new(Uuid::from_u128(2), Uuid::from_u128(10), 90);

        let summary = aggregate(&risk, [&old, &foreign], &matrix).unwrap();
        assert_eq!(summary.control_count, 0);
        assert_eq!(summary.residual_score, 16);
    }

    #[test]
    fn test_invalid_assessment_fails_risk() {
        let (matrix, risk) = setup();
        let bad = RiskAssessment::new(risk.id, Uuid::from_u128(10), 120);
        assert!(aggregate(&risk, [&bad], &matrix).is_err());
    }

    #[test]
    fn test_aggregate_all_collects_skipped() {
        let (matrix, risk) = setup();
        let mut broken = Risk::new("Broken", "security", 9, 1);
        broken.id = Uuid::from_u128(2);

        let mut ledger = AssessmentLedger::new();
        ledger.record(risk.id, Uuid::from_u128(10), 50, chrono::Utc::now(), "").unwrap();

        let batch = aggregate_all(&[risk.clone(), broken], &ledger, &matrix);
        assert_eq!(batch.summaries.len(), 1);
        assert_eq!(batch.get(&risk.id).map(|s| s.residual_score), Some(8));
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].risk_id, Uuid::from_u128(2));
    }

    #[test]
    fn test_superseded_assessment_leaves_aggregation() {
        let (matrix, risk) = setup();
        let control = Uuid::from_u128(10);
        let mut ledger = AssessmentLedger::new();

        ledger.record(risk.id, control, 90, chrono::Utc::now(), "").unwrap();
        ledger.record(risk.id, control, 20, chrono::Utc::now(), "control degraded").unwrap();

        let batch = aggregate_all(std::slice::from_ref(&risk), &ledger, &matrix);
        let summary = batch.get(&risk.id).unwrap();
        assert_eq!(summary.control_count, 1);
        assert_eq!(summary.avg_effectiveness, 20.0);
        assert_eq!(summary.residual_score, 12);
        assert_eq!(ledger.history(risk.id, control).len(), 2);
    }
}
