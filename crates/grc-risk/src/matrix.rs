//! Risk Matrix
//!
//! Scoring scale for one tenant: how many likelihood/impact levels exist and
//! which product scores fall into which qualitative band.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{check_rating, RatingField, RiskError, RiskResult};

/// Upper bound on levels per axis
pub const MAX_LEVELS: u32 = 100;

/// Qualitative risk band, ordered `Low < Medium < High < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// All bands in ascending order
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label attached to one level of an axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub label: String,
    #[serde(default)]
    pub description: String,
}

/// Likelihood x impact scoring matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMatrix {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub likelihood_levels: u32,
    pub impact_levels: u32,
    pub low_threshold: u32,
    pub medium_threshold: u32,
    pub high_threshold: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub likelihood_definitions: BTreeMap<u32, LevelDefinition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub impact_definitions: BTreeMap<u32, LevelDefinition>,
}

impl RiskMatrix {
    /// Create an unlabeled matrix
    pub fn new(
        likelihood_levels: u32,
        impact_levels: u32,
        low_threshold: u32,
        medium_threshold: u32,
        high_threshold: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            likelihood_levels,
            impact_levels,
            low_threshold,
            medium_threshold,
            high_threshold,
            likelihood_definitions: BTreeMap::new(),
            impact_definitions: BTreeMap::new(),
        }
    }

    /// Standard 5x5 matrix with thresholds (6, 12, 20)
    pub fn default_5x5() -> Self {
        let likelihood = [
            ("Rare", "May occur only in exceptional circumstances"),
            ("Unlikely", "Could occur at some time"),
            ("Possible", "Might occur at some time"),
            ("Likely", "Will probably occur"),
            ("Almost Certain", "Expected to occur in most circumstances"),
        ];
        let impact = [
            ("Negligible", "Minimal impact"),
            ("Minor", "Small impact"),
            ("Moderate", "Noticeable impact"),
            ("Major", "Significant impact"),
            ("Catastrophic", "Severe impact"),
        ];

        let mut matrix = Self::new(5, 5, 6, 12, 20);
        matrix.name = "5x5 Standard Risk Matrix".into();
        matrix.likelihood_definitions = definitions(&likelihood);
        matrix.impact_definitions = definitions(&impact);
        matrix
    }

    /// Highest score the matrix can produce
    pub fn max_score(&self) -> u32 {
        self.likelihood_levels.saturating_mul(self.impact_levels)
    }

    /// Check level counts and threshold ordering
    pub fn validate(&self) -> RiskResult<()> {
        if self.likelihood_levels < 2 || self.impact_levels < 2 {
            return Err(RiskError::InvalidMatrix(format!(
                "need at least 2 levels per axis, got {}x{}",
                self.likelihood_levels, self.impact_levels
            )));
        }
        if self.likelihood_levels > MAX_LEVELS || self.impact_levels > MAX_LEVELS {
            return Err(RiskError::InvalidMatrix(format!(
                "at most {} levels per axis, got {}x{}",
                MAX_LEVELS, self.likelihood_levels, self.impact_levels
            )));
        }
        if self.low_threshold == 0 {
            return Err(RiskError::InvalidMatrix("low threshold must be positive".into()));
        }
        if !(self.low_threshold < self.medium_threshold && self.medium_threshold < self.high_threshold) {
            return Err(RiskError::InvalidMatrix(format!(
                "thresholds must be strictly ascending, got ({}, {}, {})",
                self.low_threshold, self.medium_threshold, self.high_threshold
            )));
        }
        if self.high_threshold > self.max_score() {
            return Err(RiskError::InvalidMatrix(format!(
                "high threshold {} exceeds max score {}",
                self.high_threshold,
                self.max_score()
            )));
        }
        Ok(())
    }

    /// Map a product score to its band
    pub fn classify(&self, score: u32) -> RiskLevel {
        if score < self.low_threshold {
            RiskLevel::Low
        } else if score < self.medium_threshold {
            RiskLevel::Medium
        } else if score < self.high_threshold {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    /// Validate a rating on the likelihood axis
    pub fn check_likelihood(&self, field: RatingField, value: u32) -> RiskResult<u32> {
        check_rating(field, value, 1, self.likelihood_levels)
    }

    /// Validate a rating on the impact axis
    pub fn check_impact(&self, field: RatingField, value: u32) -> RiskResult<u32> {
        check_rating(field, value, 1, self.impact_levels)
    }

    /// Label for a likelihood level, if defined
    pub fn likelihood_label(&self, level: u32) -> Option<&str> {
        self.likelihood_definitions.get(&level).map(|d| d.label.as_str())
    }

    /// Label for an impact level, if defined
    pub fn impact_label(&self, level: u32) -> Option<&str> {
        self.impact_definitions.get(&level).map(|d| d.label.as_str())
    }
}

fn definitions(entries: &[(&str, &str)]) -> BTreeMap<u32, LevelDefinition> {
    entries
        .iter()
        .enumerate()
        .map(|(i, (label, description))| {
            (
                i as u32 + 1,
                LevelDefinition {
                    label: label.to_string(),
                    description: description.to_string(),
                },
            )
        })
        .collect()
}

/// Per-tenant set of matrices with at most one active
#[derive(Debug, Default, Clone)]
pub struct MatrixCatalog {
    matrices: BTreeMap<Uuid, RiskMatrix>,
    active: Option<Uuid>,
}

impl MatrixCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a matrix without activating it
    pub fn insert(&mut self, matrix: RiskMatrix) -> Uuid {
        let id = matrix.id;
        self.matrices.insert(id, matrix);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&RiskMatrix> {
        self.matrices.get(id)
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Make `id` the active matrix, replacing the previous one
    pub fn activate(&mut self, id: Uuid) -> RiskResult<&RiskMatrix> {
        let matrix = self.matrices.get(&id).ok_or(RiskError::MatrixNotFound(id))?;
        matrix.validate()?;

        if let Some(previous) = self.active.replace(id) {
            if previous != id {
                tracing::info!(%previous, activated = %id, "risk matrix replaced");
            }
        }
        Ok(matrix)
    }

    pub fn deactivate_all(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&RiskMatrix> {
        self.active.and_then(|id| self.matrices.get(&id))
    }

    pub fn is_active(&self, id: &Uuid) -> bool {
        self.active.as_ref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_bands() {
        let m = RiskMatrix::default_5x5();
        assert_eq!(m.classify(1), RiskLevel::Low);
        assert_eq!(m.classify(5), RiskLevel::Low);
        assert_eq!(m.classify(6), RiskLevel::Medium);
        assert_eq!(m.classify(8), RiskLevel::Medium);
        assert_eq!(m.classify(12), RiskLevel::High);
        assert_eq!(m.classify(16), RiskLevel::High);
        assert_eq!(m.classify(20), RiskLevel::Critical);
        assert_eq!(m.classify(25), RiskLevel::Critical);
    }

    #[test]
    fn test_default_matrix_is_valid() {
        let m = RiskMatrix::default_5x5();
        assert!(m.validate().is_ok());
        assert_eq!(m.max_score(), 25);
        assert_eq!(m.likelihood_label(1), Some("Rare"));
        assert_eq!(m.impact_label(5), Some("Catastrophic"));
    }

    #[test]
    fn test_validate_rejects_unordered_thresholds() {
        let m = RiskMatrix::new(5, 5, 12, 6, 20);
        assert!(matches!(m.validate(), Err(RiskError::InvalidMatrix(_))));

        let m = RiskMatrix::new(5, 5, 6, 12, 12);
        assert!(matches!(m.validate(), Err(RiskError::InvalidMatrix(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_axes() {
        let m = RiskMatrix::new(70_000, 70_000, 1, 2, 3);
        assert_eq!(m.max_score(), u32::MAX);
        assert!(matches!(m.validate(), Err(RiskError::InvalidMatrix(_))));

        assert!(matches!(
            RiskMatrix::new(MAX_LEVELS + 1, 5, 6, 12, 20).validate(),
            Err(RiskError::InvalidMatrix(_))
        ));
        assert!(RiskMatrix::new(MAX_LEVELS, MAX_LEVELS, 6, 12, 20).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_threshold_above_max() {
        let m = RiskMatrix::new(3, 3, 2, 4, 10);
        assert!(matches!(m.validate(), Err(RiskError::InvalidMatrix(_))));
        assert!(RiskMatrix::new(3, 3, 2, 4, 9).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_small_axes_and_zero_low() {
        assert!(RiskMatrix::new(1, 5, 1, 2, 3).validate().is_err());
        assert!(RiskMatrix::new(5, 5, 0, 2, 3).validate().is_err());
    }

    #[test]
    fn test_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert_eq!(serde_json::to_string(&RiskLevel::Critical).unwrap(), "\"critical\"");
    }

    #[test]
    fn test_catalog_exclusive_activation() {
        let mut catalog = MatrixCatalog::new();
        let first = catalog.insert(RiskMatrix::default_5x5());
        let second = catalog.insert(RiskMatrix::new(4, 4, 3, 6, 12));

        catalog.activate(first).unwrap();
        assert!(catalog.is_active(&first));

        catalog.activate(second).unwrap();
        assert!(!catalog.is_active(&first));
        assert_eq!(catalog.active().map(|m| m.id), Some(second));
    }

    #[test]
    fn test_catalog_refuses_invalid_matrix() {
        let mut catalog = MatrixCatalog::new();
        let good = catalog.insert(RiskMatrix::default_5x5());
        let bad = catalog.insert(RiskMatrix::new(5, 5, 20, 12, 6));

        catalog.activate(good).unwrap();
        assert!(catalog.activate(bad).is_err());
        assert!(catalog.is_active(&good));

        let missing = Uuid::new_v4();
        assert_eq!(catalog.activate(missing).unwrap_err(), RiskError::MatrixNotFound(missing));
    }
}
