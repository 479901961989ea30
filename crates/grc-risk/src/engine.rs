//! Risk Engine
//!
//! Evaluates one tenant's register snapshot end to end.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::assessment::RiskAssessment;
use crate::config::EngineConfig;
use crate::error::{RiskError, RiskResult};
use crate::heatmap::{build_heat_map, HeatMapResult};
use crate::ledger::AssessmentLedger;
use crate::matrix::RiskMatrix;
use crate::portfolio::{
    scored_population, snapshots_from_ledger, summarize, PortfolioScope, PortfolioSummary, ScoreSnapshot,
    SummaryOptions,
};
use crate::residual::{aggregate_all, ResidualRiskSummary};
use crate::risk::Risk;
use crate::treatment::{prioritize, TreatmentPriority};

/// Consistent input for one tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterSnapshot {
    pub tenant_id: String,
    pub matrix: RiskMatrix,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub assessments: Vec<RiskAssessment>,
    #[serde(default)]
    pub snapshots: Vec<ScoreSnapshot>,
}

impl RegisterSnapshot {
    pub fn new(tenant_id: &str, matrix: RiskMatrix) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            matrix,
            risks: Vec::new(),
            assessments: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    /// Load from a JSON file
    pub fn load(path: &str) -> RiskResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Assessments that point at risks outside the register
    pub fn orphaned_assessments(&self) -> Vec<RiskError> {
        let ids: HashSet<Uuid> = self.risks.iter().map(|r| r.id).collect();
        self.assessments
            .iter()
            .filter(|a| !ids.contains(&a.risk_id))
            .map(|a| RiskError::UnknownRisk(a.risk_id))
            .collect()
    }
}

/// Everything the dashboard renders for one tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantReport {
    pub tenant_id: String,
    pub generated_at: DateTime<Utc>,
    pub residual_risk_data: BTreeMap<Uuid, ResidualRiskSummary>,
    pub heat_map: HeatMapResult,
    pub summary: PortfolioSummary,
    pub priorities: Vec<TreatmentPriority>,
    pub warnings: Vec<String>,
}

/// Main risk engine
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    config: EngineConfig,
}

impl RiskEngine {
    pub fn new(config: EngineConfig) -> RiskResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate the whole register
    pub fn evaluate(&self, snapshot: &RegisterSnapshot, as_of: NaiveDate) -> RiskResult<TenantReport> {
        self.evaluate_scoped(snapshot, &PortfolioScope::all(), as_of)
    }

    /// Evaluate the part of the register selected by `scope`
    ///
    /// Fails before any scoring when the matrix is invalid or the snapshot
    /// holds two current assessments for one risk/control pair. Bad ratings on
    /// individual risks only skip those risks.
    pub fn evaluate_scoped(
        &self,
        snapshot: &RegisterSnapshot,
        scope: &PortfolioScope,
        as_of: NaiveDate,
    ) -> RiskResult<TenantReport> {
        let span = tracing::info_span!("evaluate", tenant = %snapshot.tenant_id);
        let _guard = span.enter();

        let matrix = &snapshot.matrix;
        matrix.validate()?;

        let ledger = AssessmentLedger::from_assessments(snapshot.assessments.iter().cloned())?;

        let mut warnings = Vec::new();
        for orphan in snapshot.orphaned_assessments() {
            tracing::warn!(error = %orphan, "assessment ignored");
            warnings.push(orphan.to_string());
        }

        let risks: Vec<Risk> = snapshot.risks.iter().filter(|r| scope.includes(r)).cloned().collect();
        let residuals = aggregate_all(&risks, &ledger, matrix);

        let open: Vec<Risk> = risks.iter().filter(|r| r.is_open()).cloned().collect();
        let heat_map = build_heat_map(&open, &residuals, matrix);

        let derived;
        let snapshots: &[ScoreSnapshot] = if snapshot.snapshots.is_empty() && self.config.snapshots_from_ledger {
            derived = snapshots_from_ledger(&ledger, &risks, matrix);
            &derived
        } else {
            &snapshot.snapshots
        };

        let options = SummaryOptions {
            scope: PortfolioScope::all(),
            top_risks_limit: self.config.top_risks_limit,
            trend_months: self.config.trend_months,
            as_of,
        };
        let summary = summarize(&risks, &residuals, snapshots, matrix, &options);

        let population = scored_population(&risks, &residuals, matrix, &PortfolioScope::all());
        let priorities = prioritize(&population, self.config.priority_limit);

        for skipped in &summary.skipped {
            warnings.push(format!("risk {} skipped: {}", skipped.risk_id, skipped.reason));
        }

        tracing::info!(
            risks = risks.len(),
            scored = summary.total_risks,
            skipped = summary.skipped.len(),
            "tenant evaluated"
        );

        Ok(TenantReport {
            tenant_id: snapshot.tenant_id.clone(),
            generated_at: Utc::now(),
            residual_risk_data: residuals.summaries,
            heat_map,
            summary,
            priorities,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::RiskLevel;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn test_invalid_matrix_fails_fast() {
        let engine = RiskEngine::default();
        let mut snapshot = RegisterSnapshot::new("acme", RiskMatrix::new(5, 5, 20, 12, 6));
        snapshot.risks.push(Risk::new("Anything", "ops", 3, 3));

        assert!(matches!(
            engine.evaluate(&snapshot, as_of()),
            Err(RiskError::InvalidMatrix(_))
        ));
    }

    #[test]
    fn test_orphaned_assessment_warns() {
        let engine = RiskEngine::default();
        let mut snapshot = RegisterSnapshot::new("acme", RiskMatrix::default_5x5());
        let risk = Risk::new("Known", "ops", 3, 3);
        snapshot.assessments.push(RiskAssessment::new(Uuid::from_u128(404), Uuid::from_u128(1), 50));
        snapshot.risks.push(risk);

        let report = engine.evaluate(&snapshot, as_of()).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.residual_risk_data.len(), 1);
    }

    #[test]
    fn test_bad_assessment_skips_only_its_risk() {
        let engine = RiskEngine::default();
        let mut snapshot = RegisterSnapshot::new("acme", RiskMatrix::default_5x5());
        let sound = Risk::new("Sound", "ops", 4, 4);
        let broken = Risk::new("Broken", "ops", 3, 3);
        snapshot.assessments.push(RiskAssessment::new(sound.id, Uuid::from_u128(1), 50));
        snapshot.assessments.push(RiskAssessment::new(broken.id, Uuid::from_u128(2), 150));
        let (sound_id, broken_id) = (sound.id, broken.id);
        snapshot.risks.extend([sound, broken]);

        let report = engine.evaluate(&snapshot, as_of()).unwrap();
        assert_eq!(report.residual_risk_data.len(), 1);
        assert_eq!(report.residual_risk_data[&sound_id].residual_score, 8);
        assert_eq!(report.summary.total_risks, 1);
        assert_eq!(report.summary.skipped.len(), 1);
        assert_eq!(report.summary.skipped[0].risk_id, broken_id);
        assert_eq!(report.summary.skipped[0].reason, "effectiveness rating 150 out of range [0, 100]");
        assert_eq!(report.warnings.len(), 1);
        // valid inherent ratings still place the skipped risk on the grid
        assert_eq!(report.heat_map.inherent.total(), 2);
    }

    #[test]
    fn test_closed_risks_excluded_from_heat_map() {
        let engine = RiskEngine::default();
        let mut snapshot = RegisterSnapshot::new("acme", RiskMatrix::default_5x5());
        let mut closed = Risk::new("Retired system", "technology", 5, 5);
        closed.close();
        snapshot.risks.push(closed);
        snapshot.risks.push(Risk::new("Active", "technology", 2, 2));

        let report = engine.evaluate(&snapshot, as_of()).unwrap();
        assert_eq!(report.heat_map.inherent.total(), 1);
        assert_eq!(report.summary.total_risks, 2);
        assert_eq!(report.summary.top_risks.len(), 1);
        assert_eq!(report.summary.top_risks[0].inherent_level, RiskLevel::Low);
    }

    #[test]
    fn test_load_reports_typed_errors() {
        let missing = std::env::temp_dir().join(format!("grc-missing-{}.json", Uuid::new_v4()));
        assert!(matches!(
            RegisterSnapshot::load(&missing.to_string_lossy()),
            Err(RiskError::Io(_))
        ));

        let garbled = std::env::temp_dir().join(format!("grc-garbled-{}.json", Uuid::new_v4()));
        std::fs::write(&garbled, "{\"tenant_id\": 7}").unwrap();
        let result = RegisterSnapshot::load(&garbled.to_string_lossy());
        std::fs::remove_file(&garbled).unwrap();
        assert!(matches!(result, Err(RiskError::Parse(_))));
    }

    #[test]
    fn test_engine_rejects_bad_config() {
        let config = EngineConfig {
            priority_limit: 0,
            ..Default::default()
        };
        assert!(RiskEngine::new(config).is_err());
    }
}
