//! Portfolio Statistics
//!
//! Register-wide aggregates over a tenant's scored risk population.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use crate::assessment::RiskAssessment;
use crate::ledger::AssessmentLedger;
use crate::matrix::{RiskLevel, RiskMatrix};
use crate::residual::{aggregate_in_force, ResidualBatch, ResidualRiskSummary, SkippedRisk};
use crate::risk::{inherent_score, Risk, RiskStatus};
use crate::round2;

/// Optional narrowing of the population
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl PortfolioScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn department(department: &str) -> Self {
        Self {
            department: Some(department.to_string()),
        }
    }

    pub fn includes(&self, risk: &Risk) -> bool {
        match &self.department {
            Some(d) => risk.in_department(d),
            None => true,
        }
    }
}

/// Point-in-time scores of one risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub risk_id: Uuid,
    pub taken_at: DateTime<Utc>,
    pub inherent_score: u32,
    pub residual_score: u32,
}

/// A risk paired with its scores
#[derive(Debug, Clone, Copy)]
pub struct ScoredRisk<'a> {
    pub risk: &'a Risk,
    pub inherent_level: RiskLevel,
    pub residual: &'a ResidualRiskSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCount {
    pub level: RiskLevel,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: RiskStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub count: usize,
    pub avg_inherent_score: f64,
    pub avg_residual_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopRisk {
    pub risk_id: Uuid,
    pub title: String,
    pub category: String,
    pub inherent_score: u32,
    pub inherent_level: RiskLevel,
    pub residual_score: u32,
    pub residual_level: RiskLevel,
    pub risk_reduction: f64,
    pub control_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Average scores for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// `YYYY-MM`
    pub month: String,
    pub avg_inherent_score: f64,
    pub avg_residual_score: f64,
    pub risk_count: usize,
}

/// Parameters for a summary run
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOptions {
    pub scope: PortfolioScope,
    pub top_risks_limit: usize,
    pub trend_months: u32,
    pub as_of: NaiveDate,
}

/// Register-wide summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_risks: usize,
    pub avg_inherent_score: f64,
    pub avg_residual_score: f64,
    pub overall_risk_reduction: f64,
    pub by_level: Vec<LevelCount>,
    pub by_residual_level: Vec<LevelCount>,
    pub by_category: Vec<CategoryBreakdown>,
    pub by_status: Vec<StatusCount>,
    pub top_risks: Vec<TopRisk>,
    pub trends: Vec<TrendPoint>,
    pub skipped: Vec<SkippedRisk>,
}

/// Pair in-scope risks with their residual summaries
///
/// Risks absent from `residuals` were skipped during aggregation and are
/// reported through the batch's own `skipped` list.
pub fn scored_population<'a>(
    risks: &'a [Risk],
    residuals: &'a ResidualBatch,
    matrix: &RiskMatrix,
    scope: &PortfolioScope,
) -> Vec<ScoredRisk<'a>> {
    risks
        .iter()
        .filter(|r| scope.includes(r))
        .filter_map(|risk| {
            residuals.get(&risk.id).map(|residual| ScoredRisk {
                risk,
                inherent_level: matrix.classify(residual.inherent_score),
                residual,
            })
        })
        .collect()
}

fn mean(total: u64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        round2(total as f64 / count as f64)
    }
}

fn level_counts(levels: impl Iterator<Item = RiskLevel>) -> Vec<LevelCount> {
    let mut counts = BTreeMap::new();
    for level in levels {
        *counts.entry(level).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(level, count)| LevelCount { level, count })
        .collect()
}

/// `(Σ inherent − Σ residual) / Σ inherent × 100`, 0 for an empty population
pub fn overall_risk_reduction(population: &[ScoredRisk<'_>]) -> f64 {
    let inherent: u64 = population.iter().map(|s| s.residual.inherent_score as u64).sum();
    let residual: u64 = population.iter().map(|s| s.residual.residual_score as u64).sum();
    if inherent == 0 {
        return 0.0;
    }
    round2(((inherent as f64 - residual as f64) / inherent as f64 * 100.0).clamp(0.0, 100.0))
}

pub fn by_category(population: &[ScoredRisk<'_>]) -> Vec<CategoryBreakdown> {
    let mut groups: BTreeMap<&str, (usize, u64, u64)> = BTreeMap::new();
    for s in population {
        let entry = groups.entry(s.risk.category.as_str()).or_default();
        entry.0 += 1;
        entry.1 += s.residual.inherent_score as u64;
        entry.2 += s.residual.residual_score as u64;
    }
    groups
        .into_iter()
        .map(|(category, (count, inherent, residual))| CategoryBreakdown {
            category: category.to_string(),
            count,
            avg_inherent_score: mean(inherent, count),
            avg_residual_score: mean(residual, count),
        })
        .collect()
}

pub fn by_status(population: &[ScoredRisk<'_>]) -> Vec<StatusCount> {
    let mut counts = BTreeMap::new();
    for s in population {
        *counts.entry(s.risk.status).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect()
}

/// Residual desc, inherent desc, created_at asc, id asc
pub(crate) fn exposure_order(a: &ScoredRisk<'_>, b: &ScoredRisk<'_>) -> Ordering {
    b.residual
        .residual_score
        .cmp(&a.residual.residual_score)
        .then(b.residual.inherent_score.cmp(&a.residual.inherent_score))
        .then(a.risk.created_at.cmp(&b.risk.created_at))
        .then(a.risk.id.cmp(&b.risk.id))
}

/// The `n` open risks with the highest residual exposure
pub fn top_risks(population: &[ScoredRisk<'_>], n: usize) -> Vec<TopRisk> {
    let mut open: Vec<_> = population.iter().filter(|s| s.risk.is_open()).collect();
    open.sort_by(|a, b| exposure_order(a, b));

    open.into_iter()
        .take(n)
        .map(|s| TopRisk {
            risk_id: s.risk.id,
            title: s.risk.title.clone(),
            category: s.risk.category.clone(),
            inherent_score: s.residual.inherent_score,
            inherent_level: s.inherent_level,
            residual_score: s.residual.residual_score,
            residual_level: s.residual.residual_level,
            risk_reduction: s.residual.risk_reduction,
            control_count: s.residual.control_count,
            created_at: s.risk.created_at,
        })
        .collect()
}

fn month_index(year: i32, month0: u32) -> i32 {
    year * 12 + month0 as i32
}

/// Monthly averages over the trailing `months` calendar months ending with
/// `as_of`'s month
///
/// Each risk contributes its latest snapshot within a month. Months without
/// snapshots are omitted. When `population` is given, snapshots of other
/// risks are ignored.
pub fn trends(
    snapshots: &[ScoreSnapshot],
    months: u32,
    as_of: NaiveDate,
    population: Option<&HashSet<Uuid>>,
) -> Vec<TrendPoint> {
    if months == 0 {
        return Vec::new();
    }
    let end = month_index(as_of.year(), as_of.month0());
    let start = end - months as i32 + 1;

    let mut buckets: BTreeMap<i32, HashMap<Uuid, &ScoreSnapshot>> = BTreeMap::new();
    for snap in snapshots {
        if population.map_or(false, |ids| !ids.contains(&snap.risk_id)) {
            continue;
        }
        let date = snap.taken_at.date_naive();
        if date > as_of {
            continue;
        }
        let index = month_index(date.year(), date.month0());
        if index < start || index > end {
            continue;
        }
        let latest = buckets.entry(index).or_default().entry(snap.risk_id).or_insert(snap);
        if snap.taken_at > latest.taken_at {
            *latest = snap;
        }
    }

    buckets
        .into_iter()
        .map(|(index, latest)| {
            let count = latest.len();
            let inherent: u64 = latest.values().map(|s| s.inherent_score as u64).sum();
            let residual: u64 = latest.values().map(|s| s.residual_score as u64).sum();
            TrendPoint {
                month: format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1),
                avg_inherent_score: mean(inherent, count),
                avg_residual_score: mean(residual, count),
                risk_count: count,
            }
        })
        .collect()
}

/// One snapshot per ledger entry, replayed in `assessed_at` order
///
/// Each snapshot aggregates the assessments in force at that moment: the
/// latest one per control of the same risk.
pub fn snapshots_from_ledger(ledger: &AssessmentLedger, risks: &[Risk], matrix: &RiskMatrix) -> Vec<ScoreSnapshot> {
    let by_id: HashMap<Uuid, &Risk> = risks.iter().map(|r| (r.id, r)).collect();

    let mut events: Vec<&RiskAssessment> = ledger.all().collect();
    events.sort_by(|a, b| a.assessed_at.cmp(&b.assessed_at).then(a.id.cmp(&b.id)));

    let mut in_force: BTreeMap<(Uuid, Uuid), &RiskAssessment> = BTreeMap::new();
    let mut snapshots = Vec::with_capacity(events.len());

    for assessment in events {
        let Some(risk) = by_id.get(&assessment.risk_id) else {
            continue;
        };
        in_force.insert((assessment.risk_id, assessment.control_id), assessment);

        let controls = in_force
            .range((risk.id, Uuid::nil())..=(risk.id, Uuid::from_u128(u128::MAX)))
            .map(|(_, a)| *a);
        match aggregate_in_force(risk, controls, matrix) {
            Ok(summary) => snapshots.push(ScoreSnapshot {
                risk_id: risk.id,
                taken_at: assessment.assessed_at,
                inherent_score: summary.inherent_score,
                residual_score: summary.residual_score,
            }),
            Err(e) => {
                tracing::debug!(assessment_id = %assessment.id, error = %e, "no snapshot for assessment");
            }
        }
    }
    snapshots
}

/// Full portfolio summary
pub fn summarize(
    risks: &[Risk],
    residuals: &ResidualBatch,
    snapshots: &[ScoreSnapshot],
    matrix: &RiskMatrix,
    options: &SummaryOptions,
) -> PortfolioSummary {
    let population = scored_population(risks, residuals, matrix, &options.scope);
    let count = population.len();

    let in_scope: HashSet<Uuid> = risks
        .iter()
        .filter(|r| options.scope.includes(r))
        .map(|r| r.id)
        .collect();

    let mut skipped: Vec<SkippedRisk> = residuals
        .skipped
        .iter()
        .filter(|s| in_scope.contains(&s.risk_id))
        .cloned()
        .collect();

    // Risks in scope that never reached aggregation
    for risk in risks.iter().filter(|r| options.scope.includes(r)) {
        if residuals.get(&risk.id).is_none() && !skipped.iter().any(|s| s.risk_id == risk.id) {
            let reason = match inherent_score(risk, matrix) {
                Err(e) => e.to_string(),
                Ok(_) => "no residual summary".to_string(),
            };
            skipped.push(SkippedRisk { risk_id: risk.id, reason });
        }
    }

    if !skipped.is_empty() {
        tracing::warn!(skipped = skipped.len(), "portfolio summary is partial");
    }

    let inherent_total: u64 = population.iter().map(|s| s.residual.inherent_score as u64).sum();
    let residual_total: u64 = population.iter().map(|s| s.residual.residual_score as u64).sum();

    PortfolioSummary {
        total_risks: count,
        avg_inherent_score: mean(inherent_total, count),
        avg_residual_score: mean(residual_total, count),
        overall_risk_reduction: overall_risk_reduction(&population),
        by_level: level_counts(population.iter().map(|s| s.inherent_level)),
        by_residual_level: level_counts(population.iter().map(|s| s.residual.residual_level)),
        by_category: by_category(&population),
        by_status: by_status(&population),
        top_risks: top_risks(&population, options.top_risks_limit),
        trends: trends(snapshots, options.trend_months, options.as_of, Some(&in_scope)),
        skipped,
    }
}
