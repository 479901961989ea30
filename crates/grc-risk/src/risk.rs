//! Risk register entries and the inherent risk calculator

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RatingField, RiskResult};
use crate::matrix::{RiskLevel, RiskMatrix};

/// Risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    /// Free-form category tag
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default)]
    pub status: RiskStatus,
    pub inherent_likelihood: u32,
    #[serde(alias = "impact")]
    pub inherent_impact: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_likelihood: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_impact: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

fn default_category() -> String {
    "operational".into()
}

impl Risk {
    /// Create new risk in the `identified` state
    pub fn new(title: &str, category: &str, likelihood: u32, impact: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            category: category.to_string(),
            department: None,
            status: RiskStatus::Identified,
            inherent_likelihood: likelihood,
            inherent_impact: impact,
            target_likelihood: None,
            target_impact: None,
            next_review_date: None,
            created_at: Utc::now(),
        }
    }

    /// Revise inherent ratings on reassessment
    pub fn reassess(&mut self, likelihood: u32, impact: u32) {
        self.inherent_likelihood = likelihood;
        self.inherent_impact = impact;
    }

    /// Close the risk; closed risks stay in the register
    pub fn close(&mut self) {
        self.status = RiskStatus::Closed;
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Whether the review date has passed
    pub fn is_overdue_for_review(&self, today: NaiveDate) -> bool {
        self.next_review_date.map_or(false, |due| today > due)
    }

    pub fn in_department(&self, department: &str) -> bool {
        self.department.as_deref() == Some(department)
    }
}

/// Risk lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskStatus {
    #[default]
    Identified,
    Assessing,
    Treating,
    Monitoring,
    Closed,
}

impl RiskStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, RiskStatus::Closed)
    }

    /// Statuses in which a risk still awaits treatment
    pub fn needs_treatment(&self) -> bool {
        matches!(self, RiskStatus::Identified | RiskStatus::Assessing | RiskStatus::Treating)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStatus::Identified => "identified",
            RiskStatus::Assessing => "assessing",
            RiskStatus::Treating => "treating",
            RiskStatus::Monitoring => "monitoring",
            RiskStatus::Closed => "closed",
        }
    }
}

/// Inherent score: likelihood x impact, both checked against the matrix
pub fn inherent_score(risk: &Risk, matrix: &RiskMatrix) -> RiskResult<u32> {
    let likelihood = matrix.check_likelihood(RatingField::Likelihood, risk.inherent_likelihood)?;
    let impact = matrix.check_impact(RatingField::Impact, risk.inherent_impact)?;
    Ok(likelihood.saturating_mul(impact))
}

pub fn inherent_level(risk: &Risk, matrix: &RiskMatrix) -> RiskResult<RiskLevel> {
    inherent_score(risk, matrix).map(|score| matrix.classify(score))
}

/// Score of the desired post-treatment state, if one is set
pub fn target_score(risk: &Risk, matrix: &RiskMatrix) -> RiskResult<Option<u32>> {
    match (risk.target_likelihood, risk.target_impact) {
        (Some(likelihood), Some(impact)) => {
            let likelihood = matrix.check_likelihood(RatingField::TargetLikelihood, likelihood)?;
            let impact = matrix.check_impact(RatingField::TargetImpact, impact)?;
            Ok(Some(likelihood.saturating_mul(impact)))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiskError;

    #[test]
    fn test_inherent_score_and_level() {
        let matrix = RiskMatrix::default_5x5();
        let risk = Risk::new("Ransomware", "security", 4, 4);

        assert_eq!(inherent_score(&risk, &matrix), Ok(16));
        assert_eq!(inherent_level(&risk, &matrix), Ok(RiskLevel::High));
    }

    #[test]
    fn test_inherent_score_rejects_out_of_range() {
        let matrix = RiskMatrix::default_5x5();

        let risk = Risk::new("Too likely", "security", 6, 2);
        assert!(matches!(
            inherent_score(&risk, &matrix),
            Err(RiskError::OutOfRangeRating { field: RatingField::Likelihood, value: 6, .. })
        ));

        let risk = Risk::new("No impact", "security", 2, 0);
        assert!(matches!(
            inherent_score(&risk, &matrix),
            Err(RiskError::OutOfRangeRating { field: RatingField::Impact, value: 0, .. })
        ));
    }

    #[test]
    fn test_score_follows_reassessment() {
        let matrix = RiskMatrix::default_5x5();
        let mut risk = Risk::new("Vendor outage", "operational", 2, 3);
        assert_eq!(inherent_score(&risk, &matrix), Ok(6));

        risk.reassess(5, 5);
        assert_eq!(inherent_level(&risk, &matrix), Ok(RiskLevel::Critical));
    }

    #[test]
    fn test_target_score() {
        let matrix = RiskMatrix::default_5x5();
        let mut risk = Risk::new("Phishing", "security", 4, 3);
        assert_eq!(target_score(&risk, &matrix), Ok(None));

        risk.target_likelihood = Some(2);
        risk.target_impact = Some(3);
        assert_eq!(target_score(&risk, &matrix), Ok(Some(6)));

        risk.target_impact = Some(9);
        assert!(target_score(&risk, &matrix).is_err());
    }

    #[test]
    fn test_review_overdue() {
        let mut risk = Risk::new("Audit finding", "compliance", 2, 2);
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(!risk.is_overdue_for_review(today));

        risk.next_review_date = NaiveDate::from_ymd_opt(2024, 5, 31);
        assert!(risk.is_overdue_for_review(today));

        risk.next_review_date = Some(today);
        assert!(!risk.is_overdue_for_review(today));
    }

    #[test]
    fn test_close_keeps_risk() {
        let mut risk = Risk::new("Legacy system", "technology", 3, 3);
        assert!(risk.is_open());
        risk.close();
        assert!(!risk.is_open());
        assert!(!risk.status.needs_treatment());
    }

    #[test]
    fn test_deserialize_impact_alias() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "inherent_likelihood": 3,
            "impact": 4,
            "created_at": "2024-01-15T00:00:00Z"
        }"#;
        let risk: Risk = serde_json::from_str(json).unwrap();
        assert_eq!(risk.inherent_impact, 4);
        assert_eq!(risk.category, "operational");
        assert_eq!(risk.status, RiskStatus::Identified);
    }
}
