//! Matrix commands

use anyhow::{Context, Result};
use colored::Colorize;
use grc_risk::{RiskLevel, RiskMatrix};
use std::fs;
use tabled::Tabled;

use crate::output::{level_colored, print_table, OutputFormat};
use crate::MatrixCommands;

#[derive(Tabled)]
struct BandRow {
    level: String,
    scores: String,
}

#[derive(Tabled)]
struct DefinitionRow {
    axis: &'static str,
    value: u32,
    label: String,
    description: String,
}

pub fn handle(action: MatrixCommands, format: OutputFormat) -> Result<()> {
    match action {
        MatrixCommands::Validate { input } => {
            let content = fs::read_to_string(&input).with_context(|| format!("reading {}", input))?;
            let matrix: RiskMatrix = if input.ends_with(".yaml") || input.ends_with(".yml") {
                serde_yaml::from_str(&content).with_context(|| format!("parsing {}", input))?
            } else {
                serde_json::from_str(&content).with_context(|| format!("parsing {}", input))?
            };
            matrix.validate()?;
            if format.is_table() {
                println!("{} {} ({}x{})", "valid".green().bold(), input, matrix.likelihood_levels, matrix.impact_levels);
                print_bands(&matrix);
            } else {
                format.print(&matrix)?;
            }
        }
        MatrixCommands::Default => {
            let matrix = RiskMatrix::default_5x5();
            if !format.is_table() {
                return format.print(&matrix);
            }
            print_bands(&matrix);
            let mut rows: Vec<DefinitionRow> = Vec::new();
            for (axis, definitions) in [
                ("likelihood", &matrix.likelihood_definitions),
                ("impact", &matrix.impact_definitions),
            ] {
                rows.extend(definitions.iter().map(|(value, d)| DefinitionRow {
                    axis,
                    value: *value,
                    label: d.label.clone(),
                    description: d.description.clone(),
                }));
            }
            print_table(rows);
        }
    }
    Ok(())
}

/// Score range covered by each level
fn bands(matrix: &RiskMatrix) -> Vec<(RiskLevel, u32, u32)> {
    let max = matrix.max_score();
    let bounds = [
        (RiskLevel::Low, 1, matrix.low_threshold.saturating_sub(1)),
        (RiskLevel::Medium, matrix.low_threshold, matrix.medium_threshold.saturating_sub(1)),
        (RiskLevel::High, matrix.medium_threshold, matrix.high_threshold.saturating_sub(1)),
        (RiskLevel::Critical, matrix.high_threshold, max),
    ];
    bounds
        .into_iter()
        .map(|(level, lo, hi)| (level, lo.max(1), hi.min(max)))
        .filter(|(_, lo, hi)| lo <= hi)
        .collect()
}

fn print_bands(matrix: &RiskMatrix) {
    let rows = bands(matrix)
        .into_iter()
        .map(|(level, lo, hi)| BandRow {
            level: level.to_string(),
            scores: format!("{lo}-{hi}"),
        })
        .collect();
    print_table::<BandRow>(rows);
    let legend: Vec<String> = RiskLevel::ALL.iter().map(|l| level_colored(*l, l.as_str()).to_string()).collect();
    println!("{}", legend.join(" "));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands_cover_scores() {
        let bands = bands(&RiskMatrix::default_5x5());
        assert_eq!(
            bands,
            vec![
                (RiskLevel::Low, 1, 5),
                (RiskLevel::Medium, 6, 11),
                (RiskLevel::High, 12, 19),
                (RiskLevel::Critical, 20, 25),
            ]
        );
    }

    #[test]
    fn test_bands_skip_empty_ranges() {
        let matrix = RiskMatrix::new(2, 2, 1, 2, 3);
        let levels: Vec<RiskLevel> = bands(&matrix).into_iter().map(|(l, _, _)| l).collect();
        assert_eq!(levels, vec![RiskLevel::Medium, RiskLevel::High, RiskLevel::Critical]);
    }
}
