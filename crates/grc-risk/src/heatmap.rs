//! Heat-Map Binner
//!
//! Buckets a risk population into an impact x likelihood grid. Ratings are
//! rounded to the nearest level and clamped into the matrix range, so every
//! risk lands in exactly one cell.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matrix::{RiskLevel, RiskMatrix};
use crate::residual::ResidualBatch;
use crate::risk::Risk;

/// A risk's position on the grid, before rounding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub risk_id: Uuid,
    pub likelihood: f64,
    pub impact: f64,
}

/// One grid cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatMapCell {
    pub impact: u32,
    pub likelihood: u32,
    pub risk_ids: Vec<Uuid>,
    pub severity: RiskLevel,
}

impl HeatMapCell {
    pub fn count(&self) -> usize {
        self.risk_ids.len()
    }
}

/// Rows indexed by impact, columns by likelihood, both ascending from level 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    pub rows: Vec<Vec<HeatMapCell>>,
}

impl Grid {
    fn empty(matrix: &RiskMatrix) -> Self {
        let rows = (1..=matrix.impact_levels)
            .map(|impact| {
                (1..=matrix.likelihood_levels)
                    .map(|likelihood| HeatMapCell {
                        impact,
                        likelihood,
                        risk_ids: Vec::new(),
                        severity: matrix.classify(impact.saturating_mul(likelihood)),
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    /// Cell at 1-based `(impact, likelihood)`
    pub fn cell(&self, impact: u32, likelihood: u32) -> Option<&HeatMapCell> {
        let row = (impact as usize).checked_sub(1)?;
        let col = (likelihood as usize).checked_sub(1)?;
        self.rows.get(row)?.get(col)
    }

    pub fn cells(&self) -> impl Iterator<Item = &HeatMapCell> + '_ {
        self.rows.iter().flatten()
    }

    /// Total number of binned risks
    pub fn total(&self) -> usize {
        self.cells().map(HeatMapCell::count).sum()
    }
}

/// Inherent and residual grids plus the matrix they were built on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatMapResult {
    pub inherent: Grid,
    pub residual: Grid,
    pub matrix: RiskMatrix,
}

/// Round to the nearest level and clamp into `[1, levels]`
fn bin(value: f64, levels: u32) -> u32 {
    if !value.is_finite() {
        return 1;
    }
    (value.round().max(1.0) as u32).min(levels)
}

/// Bin points into a grid
pub fn build_grid(points: &[GridPoint], matrix: &RiskMatrix) -> Grid {
    let mut grid = Grid::empty(matrix);

    for point in points {
        let impact = bin(point.impact, matrix.impact_levels);
        let likelihood = bin(point.likelihood, matrix.likelihood_levels);
        grid.rows[impact as usize - 1][likelihood as usize - 1]
            .risk_ids
            .push(point.risk_id);
    }
    grid
}

/// Grid position from inherent ratings
pub fn inherent_point(risk: &Risk) -> GridPoint {
    GridPoint {
        risk_id: risk.id,
        likelihood: risk.inherent_likelihood as f64,
        impact: risk.inherent_impact as f64,
    }
}

/// Grid position from residual score, factored against the unchanged impact
///
/// Risks without a residual summary fall back to their inherent position.
pub fn residual_point(risk: &Risk, residuals: &ResidualBatch) -> GridPoint {
    match residuals.get(&risk.id) {
        Some(summary) if risk.inherent_impact > 0 => GridPoint {
            risk_id: risk.id,
            likelihood: summary.residual_score as f64 / risk.inherent_impact as f64,
            impact: risk.inherent_impact as f64,
        },
        _ => inherent_point(risk),
    }
}

/// Build both grids for a population
pub fn build_heat_map(risks: &[Risk], residuals: &ResidualBatch, matrix: &RiskMatrix) -> HeatMapResult {
    let inherent: Vec<_> = risks.iter().map(inherent_point).collect();
    let residual: Vec<_> = risks.iter().map(|r| residual_point(r, residuals)).collect();

    HeatMapResult {
        inherent: build_grid(&inherent, matrix),
        residual: build_grid(&residual, matrix),
        matrix: matrix.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AssessmentLedger;
    use crate::residual::aggregate_all;

    fn point(id: u128, likelihood: f64, impact: f64) -> GridPoint {
        GridPoint {
            risk_id: Uuid::from_u128(id),
            likelihood,
            impact,
        }
    }

    #[test]
    fn test_grid_dimensions_and_severity() {
        let matrix = RiskMatrix::new(4, 3, 3, 6, 10);
        let grid = build_grid(&[], &matrix);

        assert_eq!(grid.rows.len(), 3);
        assert!(grid.rows.iter().all(|row| row.len() == 4));
        assert_eq!(grid.cell(1, 1).map(|c| c.severity), Some(RiskLevel::Low));
        assert_eq!(grid.cell(3, 4).map(|c| c.severity), Some(RiskLevel::Critical));
        assert_eq!(grid.cell(2, 3).map(|c| c.severity), Some(RiskLevel::High));
        assert!(grid.cell(0, 1).is_none());
        assert!(grid.cell(4, 1).is_none());
    }

    #[test]
    fn test_rounding_and_clamping() {
        let matrix = RiskMatrix::default_5x5();
        let points = [
            point(1, 2.4, 3.0),
            point(2, 2.5, 3.0),
            point(3, 0.2, 0.0),
            point(4, 9.0, 7.6),
            point(5, f64::NAN, 2.0),
        ];
        let grid = build_grid(&points, &matrix);

        assert_eq!(grid.cell(3, 2).unwrap().risk_ids, vec![Uuid::from_u128(1)]);
        assert_eq!(grid.cell(3, 3).unwrap().risk_ids, vec![Uuid::from_u128(2)]);
        assert_eq!(grid.cell(1, 1).unwrap().risk_ids, vec![Uuid::from_u128(3)]);
        assert_eq!(grid.cell(5, 5).unwrap().risk_ids, vec![Uuid::from_u128(4)]);
        assert_eq!(grid.cell(2, 1).unwrap().risk_ids, vec![Uuid::from_u128(5)]);
        assert_eq!(grid.total(), points.len());
    }

    #[test]
    fn test_heat_map_residual_position() {
        let matrix = RiskMatrix::default_5x5();
        let mut risk = Risk::new("Data breach", "security", 4, 4);
        risk.id = Uuid::from_u128(1);
        let mut untreated = Risk::new("Flood", "environmental", 2, 5);
        untreated.id = Uuid::from_u128(2);

        let mut ledger = AssessmentLedger::new();
        ledger.record(risk.id, Uuid::from_u128(10), 50, chrono::Utc::now(), "").unwrap();
        let risks = vec![risk, untreated];
        let residuals = aggregate_all(&risks, &ledger, &matrix);

        let map = build_heat_map(&risks, &residuals, &matrix);
        assert_eq!(map.inherent.cell(4, 4).unwrap().count(), 1);
        assert_eq!(map.residual.cell(4, 2).unwrap().count(), 1);
        assert_eq!(map.residual.cell(5, 2).unwrap().count(), 1);
        assert_eq!(map.inherent.total(), 2);
        assert_eq!(map.residual.total(), 2);
    }
}
