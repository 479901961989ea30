//! Multi-tenant batch evaluation
//!
//! Each tenant's register is evaluated on its own blocking task; one tenant
//! failing does not stop the others.

use anyhow::Result;
use chrono::NaiveDate;
use grc_risk::{RegisterSnapshot, RiskEngine, TenantReport};
use serde::Serialize;
use std::sync::Arc;
use tabled::Tabled;
use tokio::task::JoinSet;

use super::load_snapshot;
use crate::output::{print_table, OutputFormat};

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct BatchRow {
    pub source: String,
    pub tenant: String,
    pub risks: usize,
    #[tabled(rename = "avg inherent")]
    pub avg_inherent_score: f64,
    #[tabled(rename = "avg residual")]
    pub avg_residual_score: f64,
    #[tabled(rename = "reduction %")]
    pub overall_risk_reduction: f64,
    pub skipped: usize,
    pub status: String,
}

impl BatchRow {
    fn from_report(source: &str, report: &TenantReport) -> Self {
        Self {
            source: source.to_string(),
            tenant: report.tenant_id.clone(),
            risks: report.summary.total_risks,
            avg_inherent_score: report.summary.avg_inherent_score,
            avg_residual_score: report.summary.avg_residual_score,
            overall_risk_reduction: report.summary.overall_risk_reduction,
            skipped: report.summary.skipped.len(),
            status: "ok".into(),
        }
    }

    fn failed(source: &str, tenant: &str, error: &str) -> Self {
        Self {
            source: source.to_string(),
            tenant: tenant.to_string(),
            risks: 0,
            avg_inherent_score: 0.0,
            avg_residual_score: 0.0,
            overall_risk_reduction: 0.0,
            skipped: 0,
            status: format!("error: {}", error),
        }
    }
}

/// Evaluate already loaded snapshots concurrently, results in input order
pub async fn evaluate_all(
    engine: Arc<RiskEngine>,
    snapshots: Vec<(String, RegisterSnapshot)>,
    as_of: NaiveDate,
) -> Result<Vec<BatchRow>> {
    let mut tasks = JoinSet::new();
    for (index, (source, snapshot)) in snapshots.into_iter().enumerate() {
        let engine = Arc::clone(&engine);
        tasks.spawn_blocking(move || {
            let row = match engine.evaluate(&snapshot, as_of) {
                Ok(report) => BatchRow::from_report(&source, &report),
                Err(e) => {
                    tracing::warn!(tenant = %snapshot.tenant_id, error = %e, "tenant evaluation failed");
                    BatchRow::failed(&source, &snapshot.tenant_id, &e.to_string())
                }
            };
            (index, row)
        });
    }

    let mut rows = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        rows.push(joined?);
    }
    rows.sort_by_key(|(index, _)| *index);
    Ok(rows.into_iter().map(|(_, row)| row).collect())
}

pub async fn handle(engine: RiskEngine, inputs: Vec<String>, as_of: NaiveDate, format: OutputFormat) -> Result<()> {
    let mut snapshots = Vec::new();
    let mut failures = Vec::new();
    for input in inputs {
        match load_snapshot(&input) {
            Ok(snapshot) => snapshots.push((input, snapshot)),
            Err(e) => failures.push(BatchRow::failed(&input, "-", &format!("{:#}", e))),
        }
    }

    tracing::info!(tenants = snapshots.len(), "starting batch evaluation");
    let mut rows = evaluate_all(Arc::new(engine), snapshots, as_of).await?;
    rows.extend(failures);

    match format {
        OutputFormat::Table => print_table(rows),
        _ => format.print(&rows)?,
    }
    Ok(())
}
