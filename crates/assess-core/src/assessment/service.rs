use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    ApprovalHistory, Assessment, AssessmentId, AssessmentItem, AssessmentPeriod, AssessmentStatus,
};
use super::repository::{
    ApprovalLedger, AssessmentRepository, LedgerError, RepositoryError,
};
use super::scoring::{
    assessment_total, ImpactFacts, ImpactScore, ItemStatus, SecurityCategory,
};
use super::workflow::{plan_transition, TransitionError, WorkflowAction, WorkflowRules};
use crate::access::{AccessPolicy, Profile, Role};
use crate::hierarchy::fiscal::{FiscalYear, YearFilter};
use crate::hierarchy::{HierarchyDirectory, UnitId};

/// One line-item edit inside an explicit commit.
#[derive(Debug, Clone)]
pub struct ItemEdit {
    pub category: SecurityCategory,
    pub status: ItemStatus,
    pub note: Option<String>,
}

/// Service composing the transition table, access policy, repository, and
/// approval ledger. Every mutation flows through here; the scoring engine is
/// re-run on each commit so the persisted total never drifts from the items.
pub struct AssessmentWorkflowService<R, L> {
    repository: Arc<R>,
    ledger: Arc<L>,
    directory: Arc<HierarchyDirectory>,
    rules: WorkflowRules,
}

impl<R, L> AssessmentWorkflowService<R, L>
where
    R: AssessmentRepository + 'static,
    L: ApprovalLedger + 'static,
{
    pub fn new(
        repository: Arc<R>,
        ledger: Arc<L>,
        directory: Arc<HierarchyDirectory>,
        rules: WorkflowRules,
    ) -> Self {
        Self {
            repository,
            ledger,
            directory,
            rules,
        }
    }

    pub fn directory(&self) -> &HierarchyDirectory {
        &self.directory
    }

    /// Open a new cycle in `draft`, seeding one line item per category.
    pub fn create(
        &self,
        unit: UnitId,
        fiscal_year: FiscalYear,
        period: AssessmentPeriod,
        actor: &Profile,
    ) -> Result<Assessment, WorkflowError> {
        if self.directory.unit(&unit).is_none() {
            return Err(WorkflowError::UnknownUnit(unit.0));
        }
        if !WorkflowAction::Submit.allowed_roles().contains(&actor.role) {
            return Err(WorkflowError::Permission {
                role: actor.role,
                action: WorkflowAction::Submit,
            });
        }
        self.check_scope(actor, &unit)?;

        let sequence = self.repository.next_sequence()?;
        let now = Utc::now();
        let assessment = Assessment {
            id: AssessmentId(format!("asm-{sequence:06}")),
            unit,
            fiscal_year,
            period,
            status: AssessmentStatus::Draft,
            total_score: None,
            impact: None,
            items: SecurityCategory::ordered()
                .into_iter()
                .map(AssessmentItem::seeded)
                .collect(),
            sequence,
            created_by: actor.user_id.clone(),
            created_at: now,
            submitted_by: None,
            submitted_at: None,
            provincial_actor: None,
            provincial_at: None,
            regional_actor: None,
            regional_at: None,
            updated_at: now,
        };

        let stored = self.repository.insert(assessment)?;
        info!(id = %stored.id.0, unit = %stored.unit.0, "assessment cycle opened");
        Ok(stored)
    }

    /// Explicit commit of line-item edits. Recomputes the weighted total in
    /// the same write so the displayed and persisted scores stay consistent.
    pub fn commit_items(
        &self,
        id: &AssessmentId,
        edits: Vec<ItemEdit>,
        actor: &Profile,
    ) -> Result<Assessment, WorkflowError> {
        let mut assessment = self.load_editable(id, actor)?;

        for (index, edit) in edits.iter().enumerate() {
            if edits[..index]
                .iter()
                .any(|earlier| earlier.category == edit.category)
            {
                return Err(WorkflowError::DuplicateItem(edit.category.key()));
            }
        }

        for edit in edits {
            let replacement =
                AssessmentItem::with_status(edit.category, edit.status, edit.note);
            match assessment
                .items
                .iter_mut()
                .find(|item| item.category == edit.category)
            {
                Some(item) => *item = replacement,
                None => assessment.items.push(replacement),
            }
        }
        assessment.total_score = Some(assessment_total(&assessment.items));
        assessment.updated_at = Utc::now();

        self.store_edit(assessment)
    }

    /// Explicit commit of incident/breach facts; scores on the canonical
    /// two-component scale.
    pub fn commit_impact(
        &self,
        id: &AssessmentId,
        facts: ImpactFacts,
        actor: &Profile,
    ) -> Result<Assessment, WorkflowError> {
        let mut assessment = self.load_editable(id, actor)?;
        assessment.impact = Some(ImpactScore::from_facts(facts));
        assessment.updated_at = Utc::now();
        self.store_edit(assessment)
    }

    /// Drive the cycle along one edge of the lifecycle. The loaded status is
    /// revalidated by the compare-and-swap write, so of two racing approvers
    /// exactly one succeeds and the other sees a conflict.
    pub fn transition(
        &self,
        id: &AssessmentId,
        action: WorkflowAction,
        actor: &Profile,
    ) -> Result<Assessment, WorkflowError> {
        let mut assessment = self
            .repository
            .fetch(id)?
            .ok_or(WorkflowError::NotFound)?;
        self.check_scope(actor, &assessment.unit)?;

        let from = assessment.status;
        let to = plan_transition(self.rules, action, actor.role, from)?;

        let now = Utc::now();
        assessment.status = to;
        assessment.updated_at = now;
        match action {
            WorkflowAction::Submit => {
                assessment.submitted_by = Some(actor.user_id.clone());
                assessment.submitted_at = Some(now);
            }
            WorkflowAction::ApproveProvincial | WorkflowAction::ReturnProvincial => {
                assessment.provincial_actor = Some(actor.user_id.clone());
                assessment.provincial_at = Some(now);
            }
            WorkflowAction::ApproveRegional | WorkflowAction::ReturnRegional => {
                assessment.regional_actor = Some(actor.user_id.clone());
                assessment.regional_at = Some(now);
            }
        }

        match self.repository.update_if_status(from, assessment.clone()) {
            Ok(()) => {}
            Err(RepositoryError::StaleStatus) => {
                return Err(WorkflowError::Conflict { found: from });
            }
            Err(other) => return Err(other.into()),
        }

        let entry = ApprovalHistory {
            assessment: assessment.id.clone(),
            from,
            to,
            action,
            actor: actor.user_id.clone(),
            at: now,
        };
        if let Err(source) = self.ledger.append(entry) {
            // The status write has already landed; losing the audit row is
            // not recoverable here and must reach the caller unfiltered.
            warn!(id = %assessment.id.0, "approval ledger append failed after status write");
            return Err(WorkflowError::AuditReconciliation(source));
        }

        info!(
            id = %assessment.id.0,
            action = action.label(),
            from = from.label(),
            to = to.label(),
            "assessment transition applied"
        );
        Ok(assessment)
    }

    pub fn get(&self, id: &AssessmentId) -> Result<Assessment, WorkflowError> {
        self.repository.fetch(id)?.ok_or(WorkflowError::NotFound)
    }

    pub fn history(&self, id: &AssessmentId) -> Result<Vec<ApprovalHistory>, WorkflowError> {
        Ok(self.ledger.for_assessment(id)?)
    }

    /// Cycles feeding the reporting read model.
    pub fn list(&self, filter: YearFilter) -> Result<Vec<Assessment>, WorkflowError> {
        Ok(self.repository.list(filter)?)
    }

    fn check_scope(&self, actor: &Profile, unit: &UnitId) -> Result<(), WorkflowError> {
        let policy = AccessPolicy::new(&self.directory);
        if policy.can_view_unit(actor, unit) {
            Ok(())
        } else {
            Err(WorkflowError::OutOfScope {
                unit: unit.0.clone(),
            })
        }
    }

    fn load_editable(
        &self,
        id: &AssessmentId,
        actor: &Profile,
    ) -> Result<Assessment, WorkflowError> {
        let assessment = self
            .repository
            .fetch(id)?
            .ok_or(WorkflowError::NotFound)?;
        self.check_scope(actor, &assessment.unit)?;
        if !assessment.status.is_editable() {
            return Err(WorkflowError::NotEditable(assessment.status.label()));
        }
        Ok(assessment)
    }

    fn store_edit(&self, assessment: Assessment) -> Result<Assessment, WorkflowError> {
        match self
            .repository
            .update_if_status(assessment.status, assessment.clone())
        {
            Ok(()) => Ok(assessment),
            Err(RepositoryError::StaleStatus) => Err(WorkflowError::Conflict {
                found: assessment.status,
            }),
            Err(other) => Err(other.into()),
        }
    }
}

/// Error raised by the workflow service.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("assessment not found")]
    NotFound,
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
    #[error("role {role:?} is not authorized to {action}", action = .action.label())]
    Permission { role: Role, action: WorkflowAction },
    #[error("unit '{unit}' is outside the caller's organizational scope")]
    OutOfScope { unit: String },
    #[error("status '{found}' is stale; reload and retry", found = .found.label())]
    Conflict { found: AssessmentStatus },
    #[error("assessment is read-only in status '{0}'")]
    NotEditable(&'static str),
    #[error("line items contain category '{0}' more than once")]
    DuplicateItem(&'static str),
    #[error("status was updated but the approval history append failed; audit reconciliation required")]
    AuditReconciliation(#[source] LedgerError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<TransitionError> for WorkflowError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::RoleNotAuthorized { role, action } => {
                Self::Permission { role, action }
            }
            TransitionError::InvalidFromState { found, .. } => Self::Conflict { found },
        }
    }
}
