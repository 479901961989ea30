//! Error types for the risk engine

use thiserror::Error;
use uuid::Uuid;

/// Risk engine error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RiskError {
    /// Matrix thresholds or level counts are inconsistent
    #[error("invalid risk matrix: {0}")]
    InvalidMatrix(String),

    /// A likelihood, impact or effectiveness value is outside its bounds
    #[error("{field} rating {value} out of range [{min}, {max}]")]
    OutOfRangeRating {
        field: RatingField,
        value: u32,
        min: u32,
        max: u32,
    },

    /// Matrix id not present in the catalog
    #[error("risk matrix not found: {0}")]
    MatrixNotFound(Uuid),

    /// Assessment refers to a risk that is not in the population
    #[error("unknown risk: {0}")]
    UnknownRisk(Uuid),

    /// Two assessments claim to be current for the same risk/control pair
    #[error("conflicting current assessments for risk {risk_id} and control {control_id}")]
    ConflictingCurrentAssessment { risk_id: Uuid, control_id: Uuid },

    /// Engine configuration error
    #[error("config error: {0}")]
    InvalidConfig(String),

    /// Reading an input file failed
    #[error("IO error: {0}")]
    Io(String),

    /// Input file is not valid JSON for the expected type
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<std::io::Error> for RiskError {
    fn from(e: std::io::Error) -> Self {
        RiskError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(e: serde_json::Error) -> Self {
        RiskError::Parse(e.to_string())
    }
}

/// Which rating an [`RiskError::OutOfRangeRating`] concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingField {
    Likelihood,
    Impact,
    TargetLikelihood,
    TargetImpact,
    Effectiveness,
}

impl std::fmt::Display for RatingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RatingField::Likelihood => "likelihood",
            RatingField::Impact => "impact",
            RatingField::TargetLikelihood => "target likelihood",
            RatingField::TargetImpact => "target impact",
            RatingField::Effectiveness => "effectiveness",
        };
        f.write_str(name)
    }
}

/// Result type for the risk engine
pub type RiskResult<T> = Result<T, RiskError>;

pub(crate) fn check_rating(field: RatingField, value: u32, min: u32, max: u32) -> RiskResult<u32> {
    if value < min || value > max {
        return Err(RiskError::OutOfRangeRating { field, value, min, max });
    }
    Ok(value)
}
