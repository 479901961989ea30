//! Engine Configuration

use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entries in `top_risks`
    pub top_risks_limit: usize,
    /// Trailing months covered by `trends`
    pub trend_months: u32,
    /// Entries in the treatment priority list
    pub priority_limit: usize,
    /// Derive trend snapshots from the assessment ledger when the caller
    /// supplies none
    pub snapshots_from_ledger: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_risks_limit: 10,
            trend_months: 12,
            priority_limit: 20,
            snapshots_from_ledger: true,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file
    pub fn load(path: &str) -> RiskResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RiskResult<()> {
        if self.top_risks_limit == 0 {
            return Err(RiskError::InvalidConfig("top_risks_limit must be positive".into()));
        }
        if self.trend_months == 0 || self.trend_months > 120 {
            return Err(RiskError::InvalidConfig(format!(
                "trend_months must be within 1-120, got {}",
                self.trend_months
            )));
        }
        if self.priority_limit == 0 {
            return Err(RiskError::InvalidConfig("priority_limit must be positive".into()));
        }
        Ok(())
    }
}
