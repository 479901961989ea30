//! CLI Configuration

use anyhow::{anyhow, bail, Context, Result};
use grc_risk::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub default_format: Option<String>,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Keys accepted by `grc config get|set`
pub const KEYS: [&str; 5] = [
    "default_format",
    "top_risks_limit",
    "trend_months",
    "priority_limit",
    "snapshots_from_ledger",
];

impl Config {
    pub fn load(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// `~/.grc/config.toml`, or `config.<profile>.toml` for a named profile
    pub fn default_path(profile: Option<&str>) -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot find home directory"))?;
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(home.join(".grc").join(filename))
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "default_format" => self.default_format.clone().unwrap_or_else(|| "(not set)".into()),
            "top_risks_limit" => self.engine.top_risks_limit.to_string(),
            "trend_months" => self.engine.trend_months.to_string(),
            "priority_limit" => self.engine.priority_limit.to_string(),
            "snapshots_from_ledger" => self.engine.snapshots_from_ledger.to_string(),
            _ => bail!("unknown config key: {}", key),
        };
        Ok(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || format!("invalid value for {}: {}", key, value);
        match key {
            "default_format" => self.default_format = Some(value.to_string()),
            "top_risks_limit" => self.engine.top_risks_limit = value.parse().with_context(invalid)?,
            "trend_months" => self.engine.trend_months = value.parse().with_context(invalid)?,
            "priority_limit" => self.engine.priority_limit = value.parse().with_context(invalid)?,
            "snapshots_from_ledger" => self.engine.snapshots_from_ledger = value.parse().with_context(invalid)?,
            _ => bail!("unknown config key: {}", key),
        }
        self.engine.validate()?;
        Ok(())
    }
}
