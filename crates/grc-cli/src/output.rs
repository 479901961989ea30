//! Output formatting

use anyhow::Result;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use grc_risk::{Grid, RiskLevel};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Resolve flag, then config value, then table
    pub fn resolve(flag: Option<OutputFormat>, configured: Option<&str>) -> Self {
        flag.or_else(|| configured.and_then(|v| OutputFormat::from_str(v, true).ok()))
            .unwrap_or(OutputFormat::Table)
    }

    pub fn is_table(&self) -> bool {
        matches!(self, OutputFormat::Table)
    }

    /// Print structured data; table output falls back to pretty JSON
    pub fn print<T: Serialize>(&self, data: &T) -> Result<()> {
        match self {
            OutputFormat::Yaml => println!("{}", serde_yaml::to_string(data)?),
            OutputFormat::Json | OutputFormat::Table => println!("{}", serde_json::to_string_pretty(data)?),
        }
        Ok(())
    }
}

pub fn print_table<R: Tabled>(rows: Vec<R>) {
    if rows.is_empty() {
        println!("{}", "(none)".dimmed());
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

pub fn level_colored(level: RiskLevel, text: &str) -> ColoredString {
    match level {
        RiskLevel::Low => text.green(),
        RiskLevel::Medium => text.yellow(),
        RiskLevel::High => text.bright_red(),
        RiskLevel::Critical => text.red().bold(),
    }
}

/// Render a grid with the highest impact row on top
pub fn print_grid(title: &str, grid: &Grid) {
    println!("{}", title.bold());
    for row in grid.rows.iter().rev() {
        let impact = row.first().map(|c| c.impact).unwrap_or_default();
        let cells: Vec<String> = row
            .iter()
            .map(|cell| level_colored(cell.severity, &format!("{:>4}", cell.count())).to_string())
            .collect();
        println!("  I{impact:<2} │{}", cells.join(" "));
    }
    let width = grid.rows.first().map(|r| r.len()).unwrap_or_default();
    let axis: Vec<String> = (1..=width).map(|l| format!("{:>4}", format!("L{l}"))).collect();
    println!("      └{}", axis.join(" "));
}

pub fn warn(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message);
}
