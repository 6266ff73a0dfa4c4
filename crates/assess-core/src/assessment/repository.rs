use serde::Serialize;

use super::domain::{ApprovalHistory, Assessment, AssessmentId, AssessmentStatus};
use crate::hierarchy::fiscal::YearFilter;

/// Storage abstraction over the hosted relational backend so the workflow
/// service can be exercised in isolation.
pub trait AssessmentRepository: Send + Sync {
    fn insert(&self, assessment: Assessment) -> Result<Assessment, RepositoryError>;

    /// Compare-and-swap update: the write succeeds only while the stored
    /// status still equals `expected`. The backing store's per-row update is
    /// the serialization point between racing approvers.
    fn update_if_status(
        &self,
        expected: AssessmentStatus,
        assessment: Assessment,
    ) -> Result<(), RepositoryError>;

    fn fetch(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError>;

    /// All cycles matching the year filter, for the reporting read model.
    fn list(&self, filter: YearFilter) -> Result<Vec<Assessment>, RepositoryError>;

    /// Next value of the monotonic creation sequence.
    fn next_sequence(&self) -> Result<u64, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stored status no longer matches the expected from-state")]
    StaleStatus,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Append-only sink for the approval audit trail.
pub trait ApprovalLedger: Send + Sync {
    fn append(&self, entry: ApprovalHistory) -> Result<(), LedgerError>;
    fn for_assessment(&self, id: &AssessmentId) -> Result<Vec<ApprovalHistory>, LedgerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("approval ledger unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized representation of an assessment's exposed state.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentStatusView {
    pub id: AssessmentId,
    pub unit: String,
    pub status: &'static str,
    pub fiscal_year_display: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_score: Option<f64>,
}

impl AssessmentStatusView {
    pub fn from_assessment(assessment: &Assessment) -> Self {
        Self {
            id: assessment.id.clone(),
            unit: assessment.unit.0.clone(),
            status: assessment.status.label(),
            fiscal_year_display: assessment.fiscal_year.display_year(),
            total_score: assessment.total_score,
            impact_score: assessment.impact.as_ref().map(|impact| impact.normalized()),
        }
    }
}
