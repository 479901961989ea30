//! Control Assessment Evaluator
//!
//! A control lowers the likelihood that a threat materializes; it does not
//! change the impact if it does. Residual likelihood is the inherent
//! likelihood scaled down linearly by the effectiveness rating, rounded half
//! up and never below 1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{check_rating, RatingField, RiskResult};
use crate::matrix::{RiskLevel, RiskMatrix};
use crate::risk::{inherent_score, Risk};

/// Upper bound of an effectiveness rating
pub const MAX_EFFECTIVENESS: u32 = 100;

/// Effect of one control on one risk at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub id: Uuid,
    pub risk_id: Uuid,
    pub control_id: Uuid,
    pub effectiveness_rating: u32,
    #[serde(default = "default_current")]
    pub is_current: bool,
    pub assessed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

fn default_current() -> bool {
    true
}

impl RiskAssessment {
    /// Create a current assessment
    pub fn new(risk_id: Uuid, control_id: Uuid, effectiveness_rating: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            risk_id,
            control_id,
            effectiveness_rating,
            is_current: true,
            assessed_at: Utc::now(),
            notes: String::new(),
        }
    }

    pub fn category(&self) -> EffectivenessCategory {
        EffectivenessCategory::from_rating(self.effectiveness_rating)
    }
}

/// Qualitative effectiveness band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectivenessCategory {
    NotEffective,
    PartiallyEffective,
    Effective,
    HighlyEffective,
}

impl EffectivenessCategory {
    pub fn from_rating(rating: u32) -> Self {
        match rating {
            90.. => EffectivenessCategory::HighlyEffective,
            70..=89 => EffectivenessCategory::Effective,
            40..=69 => EffectivenessCategory::PartiallyEffective,
            _ => EffectivenessCategory::NotEffective,
        }
    }
}

/// Residual values derived from one assessment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualRating {
    pub inherent_score: u32,
    pub residual_likelihood: u32,
    pub residual_impact: u32,
    pub residual_score: u32,
    pub residual_level: RiskLevel,
    pub risk_reduction: f64,
}

/// Scale a likelihood down by an effectiveness percentage
pub fn residual_likelihood(inherent_likelihood: u32, effectiveness_rating: u32) -> RiskResult<u32> {
    let rating = check_rating(RatingField::Effectiveness, effectiveness_rating, 0, MAX_EFFECTIVENESS)?;
    let scaled = (u64::from(inherent_likelihood) * u64::from(MAX_EFFECTIVENESS - rating)
        + u64::from(MAX_EFFECTIVENESS / 2))
        / u64::from(MAX_EFFECTIVENESS);
    // scaled <= inherent_likelihood
    Ok((scaled as u32).max(1))
}

/// Percentage drop from inherent to residual, clamped to [0, 100]
pub fn risk_reduction(inherent_score: u32, residual_score: u32) -> f64 {
    if inherent_score == 0 {
        return 0.0;
    }
    let reduction = (inherent_score as f64 - residual_score as f64) / inherent_score as f64 * 100.0;
    reduction.clamp(0.0, 100.0)
}

/// Residual rating of `risk` under a control with the given effectiveness
pub fn evaluate(risk: &Risk, effectiveness_rating: u32, matrix: &RiskMatrix) -> RiskResult<ResidualRating> {
    let inherent = inherent_score(risk, matrix)?;
    let likelihood = residual_likelihood(risk.inherent_likelihood, effectiveness_rating)?;
    let impact = risk.inherent_impact;
    let score = likelihood.saturating_mul(impact);

    Ok(ResidualRating {
        inherent_score: inherent,
        residual_likelihood: likelihood,
        residual_impact: impact,
        residual_score: score,
        residual_level: matrix.classify(score),
        risk_reduction: risk_reduction(inherent, score),
    })
}

/// Residual rating of an assessment against its risk
pub fn evaluate_assessment(
    risk: &Risk,
    assessment: &RiskAssessment,
    matrix: &RiskMatrix,
) -> RiskResult<ResidualRating> {
    evaluate(risk, assessment.effectiveness_rating, matrix)
}
