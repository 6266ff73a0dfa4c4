use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scoring::{item_score, ImpactScore, ItemStatus, SecurityCategory};
use crate::hierarchy::fiscal::FiscalYear;
use crate::hierarchy::UnitId;

/// Identifier wrapper for assessment cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssessmentId(pub String);

/// Review round within one fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentPeriod {
    FirstRound,
    SecondRound,
}

impl AssessmentPeriod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstRound => "First Round",
            Self::SecondRound => "Second Round",
        }
    }
}

/// Lifecycle state of an assessment cycle. Persisted as snake_case strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Draft,
    Submitted,
    ApprovedProvincial,
    ApprovedRegional,
    Returned,
    Completed,
}

impl AssessmentStatus {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Draft,
            Self::Submitted,
            Self::ApprovedProvincial,
            Self::ApprovedRegional,
            Self::Returned,
            Self::Completed,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::ApprovedProvincial => "approved_provincial",
            Self::ApprovedRegional => "approved_regional",
            Self::Returned => "returned",
            Self::Completed => "completed",
        }
    }

    /// Item and impact edits are only allowed before the cycle enters review.
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Returned)
    }

    /// Whether this status counts toward official aggregate statistics.
    /// Draft, submitted, and returned cycles must never be aggregated.
    pub const fn counts_as_approved(self) -> bool {
        matches!(
            self,
            Self::ApprovedProvincial | Self::ApprovedRegional | Self::Completed
        )
    }
}

/// One scored line item per category, created in bulk when the cycle opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentItem {
    pub category: SecurityCategory,
    pub status: ItemStatus,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AssessmentItem {
    pub fn seeded(category: SecurityCategory) -> Self {
        Self {
            category,
            status: ItemStatus::Fail,
            score: 0.0,
            note: None,
        }
    }

    pub fn with_status(category: SecurityCategory, status: ItemStatus, note: Option<String>) -> Self {
        Self {
            category,
            status,
            score: item_score(category, status),
            note,
        }
    }
}

/// One assessment cycle for one unit, identified by (unit, fiscal year,
/// period). Never deleted, only superseded by a later cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub unit: UnitId,
    pub fiscal_year: FiscalYear,
    pub period: AssessmentPeriod,
    pub status: AssessmentStatus,
    /// Derived; `None` until the first item commit computes it.
    pub total_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<ImpactScore>,
    pub items: Vec<AssessmentItem>,
    /// Monotonic creation sequence; "latest per unit" selection key.
    pub sequence: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provincial_actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provincial_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regional_actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regional_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit record; one row per transition, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalHistory {
    pub assessment: AssessmentId,
    pub from: AssessmentStatus,
    pub to: AssessmentStatus,
    pub action: super::workflow::WorkflowAction,
    pub actor: String,
    pub at: DateTime<Utc>,
}
