//! CLI Commands

pub mod report;
pub mod batch;
pub mod matrix;
pub mod config;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use grc_risk::{PortfolioScope, RegisterSnapshot, RiskEngine, TenantReport};

use crate::output::{self, OutputFormat};

/// Shared state for commands that evaluate a register
pub struct Session {
    pub engine: RiskEngine,
    pub format: OutputFormat,
}

impl Session {
    pub fn new(engine: RiskEngine, format: OutputFormat) -> Self {
        Self { engine, format }
    }

    /// Load a snapshot file and evaluate it
    pub fn evaluate(&self, input: &str, department: Option<&str>, as_of: Option<NaiveDate>) -> Result<TenantReport> {
        let snapshot = load_snapshot(input)?;
        let scope = match department {
            Some(d) => PortfolioScope::department(d),
            None => PortfolioScope::all(),
        };
        let report = self
            .engine
            .evaluate_scoped(&snapshot, &scope, as_of.unwrap_or_else(today))
            .with_context(|| format!("evaluating tenant {}", snapshot.tenant_id))?;

        if self.format.is_table() {
            for warning in &report.warnings {
                output::warn(warning);
            }
        }
        Ok(report)
    }
}

pub fn load_snapshot(input: &str) -> Result<RegisterSnapshot> {
    RegisterSnapshot::load(input).with_context(|| format!("loading register snapshot {}", input))
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
