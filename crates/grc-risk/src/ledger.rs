//! Assessment Ledger
//!
//! Versioned assessments per (risk, control) pair. Exactly one version per
//! pair is current; recording a new one supersedes it. Superseded versions
//! are immutable history and are chained by SHA-256 so the audit trail can be
//! verified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::assessment::{RiskAssessment, MAX_EFFECTIVENESS};
use crate::error::{check_rating, RatingField, RiskError, RiskResult};

const GENESIS: &str = "genesis";

/// Ledger entry: an assessment plus its position in the hash chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub assessment: RiskAssessment,
    pub prev_hash: String,
    pub hash: String,
}

impl LedgerEntry {
    fn new(assessment: RiskAssessment, prev_hash: &str) -> Self {
        let hash = compute_hash(&assessment, prev_hash);
        Self {
            assessment,
            prev_hash: prev_hash.to_string(),
            hash,
        }
    }
}

fn compute_hash(a: &RiskAssessment, prev_hash: &str) -> String {
    // is_current is excluded: it flips when the entry is superseded
    let data = format!(
        "{}|{}|{}|{}|{}|{}|{}",
        a.id,
        a.risk_id,
        a.control_id,
        a.effectiveness_rating,
        a.assessed_at.to_rfc3339(),
        a.notes,
        prev_hash
    );
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Chain verification result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityResult {
    pub valid: bool,
    pub checked_count: usize,
    pub error: Option<String>,
}

/// Versioned assessment store for one tenant
#[derive(Debug, Default, Clone)]
pub struct AssessmentLedger {
    /// Recording order
    entries: Vec<LedgerEntry>,
    /// (risk, control) -> entry indices, oldest first
    versions: BTreeMap<(Uuid, Uuid), Vec<usize>>,
    /// (risk, control) -> current entry index
    current: BTreeMap<(Uuid, Uuid), usize>,
}

impl AssessmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import an external collection, keeping its `is_current` flags
    ///
    /// Entries are chained in `assessed_at` order. Two current assessments for
    /// the same pair are rejected. Ratings are stored as given; an out-of-range
    /// rating surfaces when its risk is aggregated.
    pub fn from_assessments(assessments: impl IntoIterator<Item = RiskAssessment>) -> RiskResult<Self> {
        let mut sorted: Vec<_> = assessments.into_iter().collect();
        sorted.sort_by(|a, b| a.assessed_at.cmp(&b.assessed_at).then(a.id.cmp(&b.id)));

        let mut ledger = Self::new();
        for assessment in sorted {
            let key = (assessment.risk_id, assessment.control_id);
            if assessment.is_current && ledger.current.contains_key(&key) {
                return Err(RiskError::ConflictingCurrentAssessment {
                    risk_id: key.0,
                    control_id: key.1,
                });
            }
            ledger.push(assessment);
        }
        Ok(ledger)
    }

    /// Record a new assessment for a risk/control pair, superseding the
    /// current one
    pub fn record(
        &mut self,
        risk_id: Uuid,
        control_id: Uuid,
        effectiveness_rating: u32,
        assessed_at: DateTime<Utc>,
        notes: &str,
    ) -> RiskResult<&RiskAssessment> {
        check_rating(RatingField::Effectiveness, effectiveness_rating, 0, MAX_EFFECTIVENESS)?;

        let key = (risk_id, control_id);
        if let Some(previous) = self.current.remove(&key) {
            self.entries[previous].assessment.is_current = false;
            tracing::debug!(
                %risk_id,
                %control_id,
                superseded = %self.entries[previous].assessment.id,
                "assessment superseded"
            );
        }

        let assessment = RiskAssessment {
            id: Uuid::new_v4(),
            risk_id,
            control_id,
            effectiveness_rating,
            is_current: true,
            assessed_at,
            notes: notes.to_string(),
        };
        let index = self.push(assessment);
        Ok(&self.entries[index].assessment)
    }

    fn push(&mut self, assessment: RiskAssessment) -> usize {
        let prev_hash = self
            .entries
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS.to_string());

        let key = (assessment.risk_id, assessment.control_id);
        let is_current = assessment.is_current;
        let index = self.entries.len();

        self.entries.push(LedgerEntry::new(assessment, &prev_hash));
        self.versions.entry(key).or_default().push(index);
        if is_current {
            self.current.insert(key, index);
        }
        index
    }

    /// All current assessments
    pub fn current(&self) -> impl Iterator<Item = &RiskAssessment> + '_ {
        self.current.values().map(move |&i| &self.entries[i].assessment)
    }

    /// Current assessments for one risk, one per control
    pub fn current_for(&self, risk_id: Uuid) -> Vec<&RiskAssessment> {
        self.current
            .range((risk_id, Uuid::nil())..=(risk_id, Uuid::from_u128(u128::MAX)))
            .map(|(_, &i)| &self.entries[i].assessment)
            .collect()
    }

    /// Every version for one pair, oldest first
    pub fn history(&self, risk_id: Uuid, control_id: Uuid) -> Vec<&RiskAssessment> {
        self.versions
            .get(&(risk_id, control_id))
            .map(|indices| indices.iter().map(|&i| &self.entries[i].assessment).collect())
            .unwrap_or_default()
    }

    /// Every assessment in recording order
    pub fn all(&self) -> impl Iterator<Item = &RiskAssessment> + '_ {
        self.entries.iter().map(|e| &e.assessment)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Verify chain integrity
    pub fn verify_integrity(&self) -> IntegrityResult {
        let mut prev_hash = GENESIS.to_string();
        let mut valid_count = 0;

        for entry in &self.entries {
            if entry.prev_hash != prev_hash {
                return IntegrityResult {
                    valid: false,
                    checked_count: valid_count,
                    error: Some(format!("hash chain broken at assessment {}", entry.assessment.id)),
                };
            }

            if compute_hash(&entry.assessment, &prev_hash) != entry.hash {
                return IntegrityResult {
                    valid: false,
                    checked_count: valid_count,
                    error: Some(format!("assessment {} hash mismatch", entry.assessment.id)),
                };
            }

            prev_hash = entry.hash.clone();
            valid_count += 1;
        }

        IntegrityResult {
            valid: true,
            checked_count: valid_count,
            error: None,
        }
    }
}
