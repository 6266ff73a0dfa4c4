//! The assessment lifecycle transition table: which role may move a cycle
//! along which edge, validated against the loaded status so a stale read
//! surfaces as a conflict instead of a silent double-apply.

use serde::{Deserialize, Serialize};

use super::domain::AssessmentStatus;
use crate::access::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Submit,
    ApproveProvincial,
    ReturnProvincial,
    ApproveRegional,
    ReturnRegional,
}

impl WorkflowAction {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Submit,
            Self::ApproveProvincial,
            Self::ReturnProvincial,
            Self::ApproveRegional,
            Self::ReturnRegional,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::ApproveProvincial => "approve_provincial",
            Self::ReturnProvincial => "return_provincial",
            Self::ApproveRegional => "approve_regional",
            Self::ReturnRegional => "return_regional",
        }
    }

    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Self::Submit => &[Role::FacilityIt, Role::HealthOfficeIt, Role::CentralAdmin],
            Self::ApproveProvincial | Self::ReturnProvincial => &[Role::ProvincialApprover],
            Self::ApproveRegional | Self::ReturnRegional => &[Role::RegionalApprover],
        }
    }

    pub const fn allowed_from(self) -> &'static [AssessmentStatus] {
        match self {
            Self::Submit => &[AssessmentStatus::Draft, AssessmentStatus::Returned],
            Self::ApproveProvincial | Self::ReturnProvincial => &[AssessmentStatus::Submitted],
            Self::ApproveRegional | Self::ReturnRegional => {
                &[AssessmentStatus::ApprovedProvincial]
            }
        }
    }
}

/// Deployment-level dials for the review ladder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRules {
    /// Single-tier deployments complete the cycle on regional approval
    /// instead of parking it in `approved_regional` for a further review.
    pub regional_approval_completes: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("role {role:?} is not authorized to {action}", action = .action.label())]
    RoleNotAuthorized { role: Role, action: WorkflowAction },
    #[error("cannot {action} from status '{found}'", action = .action.label(), found = .found.label())]
    InvalidFromState {
        action: WorkflowAction,
        found: AssessmentStatus,
    },
}

/// Validate one transition and compute the target status. Pure; the caller
/// owns persistence and the append to the approval ledger.
pub fn plan_transition(
    rules: WorkflowRules,
    action: WorkflowAction,
    role: Role,
    current: AssessmentStatus,
) -> Result<AssessmentStatus, TransitionError> {
    if !action.allowed_roles().contains(&role) {
        return Err(TransitionError::RoleNotAuthorized { role, action });
    }
    if !action.allowed_from().contains(&current) {
        return Err(TransitionError::InvalidFromState {
            action,
            found: current,
        });
    }

    Ok(match action {
        WorkflowAction::Submit => AssessmentStatus::Submitted,
        WorkflowAction::ApproveProvincial => AssessmentStatus::ApprovedProvincial,
        WorkflowAction::ApproveRegional => {
            if rules.regional_approval_completes {
                AssessmentStatus::Completed
            } else {
                AssessmentStatus::ApprovedRegional
            }
        }
        WorkflowAction::ReturnProvincial | WorkflowAction::ReturnRegional => {
            AssessmentStatus::Returned
        }
    })
}
