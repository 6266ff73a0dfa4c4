//! Assessment lifecycle: domain records, deterministic scoring, the approval
//! state machine, and its HTTP surface.

pub mod domain;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use domain::{
    ApprovalHistory, Assessment, AssessmentId, AssessmentItem, AssessmentPeriod, AssessmentStatus,
};
pub use repository::{
    ApprovalLedger, AssessmentRepository, AssessmentStatusView, LedgerError, RepositoryError,
};
pub use router::{workflow_router, ActorClaims};
pub use scoring::{
    assessment_total, item_score, BreachSeverity, ImpactFacts, ImpactScore, ItemStatus,
    SecurityCategory,
};
pub use service::{AssessmentWorkflowService, ItemEdit, WorkflowError};
pub use workflow::{plan_transition, TransitionError, WorkflowAction, WorkflowRules};
