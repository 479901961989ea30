//! GRC Risk Engine
//!
//! Risk scoring and heat-map aggregation for a multi-tenant compliance
//! register. Turns likelihood/impact ratings and per-control effectiveness
//! assessments into inherent scores, residual scores, severity levels and
//! portfolio statistics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        RISK ENGINE                                  │
//! │                                                                     │
//! │  ┌──────────────┐   ┌──────────────┐   ┌─────────────────────────┐  │
//! │  │ Risk Matrix  │──▶│  Inherent    │──▶│  Control Assessment     │  │
//! │  │ (thresholds) │   │  Calculator  │   │  Evaluator + Ledger     │  │
//! │  └──────────────┘   └──────────────┘   └───────────┬─────────────┘  │
//! │                                                    │                │
//! │                                      ┌─────────────▼─────────────┐  │
//! │                                      │ Residual Risk Aggregator  │  │
//! │                                      └─────────────┬─────────────┘  │
//! │                    ┌───────────────────────┬───────┴──────────┐     │
//! │             ┌──────▼──────┐       ┌────────▼────────┐  ┌──────▼───┐ │
//! │             │  Heat Map   │       │   Portfolio     │  │Treatment │ │
//! │             │   Binner    │       │   Statistics    │  │ Priority │ │
//! │             └─────────────┘       └─────────────────┘  └──────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation is a pure function of an immutable snapshot; the active
//! matrix is always passed explicitly.

#![warn(clippy::all)]

pub mod error;
pub mod matrix;
pub mod risk;
pub mod assessment;
pub mod ledger;
pub mod residual;
pub mod heatmap;
pub mod portfolio;
pub mod treatment;
pub mod config;
pub mod engine;

pub use error::{RatingField, RiskError, RiskResult};
pub use matrix::{LevelDefinition, MatrixCatalog, RiskLevel, RiskMatrix, MAX_LEVELS};
pub use risk::{inherent_level, inherent_score, target_score, Risk, RiskStatus};
pub use assessment::{evaluate, EffectivenessCategory, ResidualRating, RiskAssessment};
pub use ledger::{AssessmentLedger, IntegrityResult, LedgerEntry};
pub use residual::{aggregate, aggregate_all, ResidualBatch, ResidualRiskSummary, SkippedRisk};
pub use heatmap::{build_grid, build_heat_map, Grid, GridPoint, HeatMapCell, HeatMapResult};
pub use portfolio::{PortfolioScope, PortfolioSummary, ScoreSnapshot, SummaryOptions, TopRisk, TrendPoint};
pub use treatment::{Priority, Recommendation, TreatmentPriority};
pub use config::EngineConfig;
pub use engine::{RegisterSnapshot, RiskEngine, TenantReport};

/// Round to two decimals for reporting
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
