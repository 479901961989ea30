//! Register report commands

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use grc_risk::{EngineConfig, RiskEngine};
use tabled::Tabled;

use super::Session;
use crate::output::{level_colored, print_grid, print_table};

#[derive(Tabled)]
struct ResidualRow {
    risk: String,
    inherent: u32,
    residual: u32,
    level: String,
    controls: usize,
    #[tabled(rename = "avg eff %")]
    avg_effectiveness: f64,
    #[tabled(rename = "reduction %")]
    reduction: f64,
}

#[derive(Tabled)]
struct TopRow {
    #[tabled(rename = "#")]
    rank: usize,
    title: String,
    category: String,
    inherent: String,
    residual: String,
    #[tabled(rename = "reduction %")]
    reduction: f64,
    controls: usize,
}

#[derive(Tabled)]
struct TrendRow {
    month: String,
    risks: usize,
    #[tabled(rename = "avg inherent")]
    avg_inherent: f64,
    #[tabled(rename = "avg residual")]
    avg_residual: f64,
}

#[derive(Tabled)]
struct PriorityRow {
    priority: String,
    title: String,
    residual: String,
    controls: usize,
    recommendation: String,
}

impl Session {
    /// Same session with adjusted engine settings
    fn adjusted(&self, f: impl FnOnce(&mut EngineConfig)) -> Result<Session> {
        let mut config = self.engine.config().clone();
        f(&mut config);
        Ok(Session::new(RiskEngine::new(config)?, self.format))
    }
}

pub fn residual(session: &Session, input: &str) -> Result<()> {
    let report = session.evaluate(input, None, None)?;
    if !session.format.is_table() {
        return session.format.print(&report.residual_risk_data);
    }

    let rows = report
        .residual_risk_data
        .values()
        .map(|s| ResidualRow {
            risk: s.risk_id.to_string(),
            inherent: s.inherent_score,
            residual: s.residual_score,
            level: s.residual_level.to_string(),
            controls: s.control_count,
            avg_effectiveness: s.avg_effectiveness,
            reduction: s.risk_reduction,
        })
        .collect();
    print_table::<ResidualRow>(rows);
    Ok(())
}

pub fn heatmap(session: &Session, input: &str, residual: bool) -> Result<()> {
    let report = session.evaluate(input, None, None)?;
    if !session.format.is_table() {
        return session.format.print(&report.heat_map);
    }

    if residual {
        print_grid("Residual risk", &report.heat_map.residual);
    } else {
        print_grid("Inherent risk", &report.heat_map.inherent);
    }
    Ok(())
}

pub fn summary(session: &Session, input: &str, department: Option<&str>, as_of: Option<NaiveDate>) -> Result<()> {
    let report = session.evaluate(input, department, as_of)?;
    let summary = &report.summary;
    if !session.format.is_table() {
        return session.format.print(summary);
    }

    println!("{} {}", "Tenant:".bold(), report.tenant_id);
    println!("Risks scored:           {}", summary.total_risks);
    println!("Avg inherent score:     {:.2}", summary.avg_inherent_score);
    println!("Avg residual score:     {:.2}", summary.avg_residual_score);
    println!("Overall risk reduction: {:.2}%", summary.overall_risk_reduction);

    let levels: Vec<String> = summary
        .by_level
        .iter()
        .map(|c| level_colored(c.level, &format!("{} {}", c.level, c.count)).to_string())
        .collect();
    println!("By inherent level:      {}", levels.join("  "));

    let categories: Vec<String> = summary
        .by_category
        .iter()
        .map(|c| format!("{} {} ({:.1} → {:.1})", c.category, c.count, c.avg_inherent_score, c.avg_residual_score))
        .collect();
    println!("By category:            {}", categories.join(", "));

    if !summary.skipped.is_empty() {
        println!("{}", format!("{} risk(s) skipped", summary.skipped.len()).yellow());
    }
    Ok(())
}

pub fn top(session: &Session, input: &str, limit: Option<usize>) -> Result<()> {
    let adjusted;
    let session = match limit {
        Some(n) => {
            adjusted = session.adjusted(|c| c.top_risks_limit = n)?;
            &adjusted
        }
        None => session,
    };
    let report = session.evaluate(input, None, None)?;
    let top = &report.summary.top_risks;
    if !session.format.is_table() {
        return session.format.print(top);
    }

    let rows = top
        .iter()
        .enumerate()
        .map(|(i, t)| TopRow {
            rank: i + 1,
            title: t.title.clone(),
            category: t.category.clone(),
            inherent: format!("{} ({})", t.inherent_score, t.inherent_level),
            residual: format!("{} ({})", t.residual_score, t.residual_level),
            reduction: t.risk_reduction,
            controls: t.control_count,
        })
        .collect();
    print_table::<TopRow>(rows);
    Ok(())
}

pub fn trends(session: &Session, input: &str, months: Option<u32>, as_of: Option<NaiveDate>) -> Result<()> {
    let adjusted;
    let session = match months {
        Some(m) => {
            adjusted = session.adjusted(|c| c.trend_months = m)?;
            &adjusted
        }
        None => session,
    };
    let report = session.evaluate(input, None, as_of)?;
    let trends = &report.summary.trends;
    if !session.format.is_table() {
        return session.format.print(trends);
    }

    let rows = trends
        .iter()
        .map(|t| TrendRow {
            month: t.month.clone(),
            risks: t.risk_count,
            avg_inherent: t.avg_inherent_score,
            avg_residual: t.avg_residual_score,
        })
        .collect();
    print_table::<TrendRow>(rows);
    Ok(())
}

pub fn priorities(session: &Session, input: &str, limit: Option<usize>) -> Result<()> {
    let adjusted;
    let session = match limit {
        Some(n) => {
            adjusted = session.adjusted(|c| c.priority_limit = n)?;
            &adjusted
        }
        None => session,
    };
    let report = session.evaluate(input, None, None)?;
    if !session.format.is_table() {
        return session.format.print(&report.priorities);
    }

    let rows = report
        .priorities
        .iter()
        .map(|p| PriorityRow {
            priority: format!("{:?}", p.priority).to_lowercase(),
            title: p.title.clone(),
            residual: format!("{} ({})", p.residual_score, p.residual_level),
            controls: p.control_count,
            recommendation: p.recommendation.describe().to_string(),
        })
        .collect();
    print_table::<PriorityRow>(rows);
    Ok(())
}
