use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AssessmentId, AssessmentPeriod};
use super::repository::{ApprovalLedger, AssessmentRepository, AssessmentStatusView};
use super::scoring::{ImpactFacts, ItemStatus, SecurityCategory};
use super::service::{AssessmentWorkflowService, ItemEdit, WorkflowError};
use super::workflow::WorkflowAction;
use crate::access::{AccessError, Profile, Role, Scope};
use crate::hierarchy::fiscal::FiscalYear;
use crate::hierarchy::UnitId;

/// Router builder exposing HTTP endpoints for the assessment lifecycle.
pub fn workflow_router<R, L>(service: Arc<AssessmentWorkflowService<R, L>>) -> Router
where
    R: AssessmentRepository + 'static,
    L: ApprovalLedger + 'static,
{
    Router::new()
        .route("/api/v1/assessments", post(create_handler::<R, L>))
        .route(
            "/api/v1/assessments/:assessment_id",
            get(status_handler::<R, L>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/items",
            post(commit_items_handler::<R, L>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/impact",
            post(commit_impact_handler::<R, L>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/actions",
            post(action_handler::<R, L>),
        )
        .with_state(service)
}

/// Authenticated identity as handed over by the session layer. Session
/// issuance itself is an external collaborator; the core only validates the
/// role/scope pairing.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorClaims {
    pub user_id: String,
    pub display_name: String,
    pub role: Role,
    pub scope: Scope,
}

impl ActorClaims {
    pub fn into_profile(self) -> Result<Profile, AccessError> {
        Profile::new(self.user_id, self.display_name, self.role, self.scope)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateAssessmentRequest {
    pub(crate) unit: String,
    /// Stored (Gregorian) fiscal year, never the displayed era year.
    pub(crate) fiscal_year: i32,
    pub(crate) period: AssessmentPeriod,
    pub(crate) actor: ActorClaims,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemEditRequest {
    pub(crate) category: SecurityCategory,
    pub(crate) status: ItemStatus,
    #[serde(default)]
    pub(crate) note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitItemsRequest {
    pub(crate) items: Vec<ItemEditRequest>,
    pub(crate) actor: ActorClaims,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitImpactRequest {
    pub(crate) facts: ImpactFacts,
    pub(crate) actor: ActorClaims,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionRequest {
    pub(crate) action: WorkflowAction,
    pub(crate) actor: ActorClaims,
}

pub(crate) async fn create_handler<R, L>(
    State(service): State<Arc<AssessmentWorkflowService<R, L>>>,
    axum::Json(request): axum::Json<CreateAssessmentRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    L: ApprovalLedger + 'static,
{
    let actor = match request.actor.into_profile() {
        Ok(profile) => profile,
        Err(error) => return claims_rejection(error),
    };

    match service.create(
        UnitId(request.unit),
        FiscalYear(request.fiscal_year),
        request.period,
        &actor,
    ) {
        Ok(assessment) => {
            let view = AssessmentStatusView::from_assessment(&assessment);
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(error) => workflow_rejection(error),
    }
}

pub(crate) async fn status_handler<R, L>(
    State(service): State<Arc<AssessmentWorkflowService<R, L>>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    L: ApprovalLedger + 'static,
{
    let id = AssessmentId(assessment_id);
    match service.get(&id) {
        Ok(assessment) => {
            let view = AssessmentStatusView::from_assessment(&assessment);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => workflow_rejection(error),
    }
}

pub(crate) async fn commit_items_handler<R, L>(
    State(service): State<Arc<AssessmentWorkflowService<R, L>>>,
    Path(assessment_id): Path<String>,
    axum::Json(request): axum::Json<CommitItemsRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    L: ApprovalLedger + 'static,
{
    let actor = match request.actor.into_profile() {
        Ok(profile) => profile,
        Err(error) => return claims_rejection(error),
    };
    let edits = request
        .items
        .into_iter()
        .map(|item| ItemEdit {
            category: item.category,
            status: item.status,
            note: item.note,
        })
        .collect();

    match service.commit_items(&AssessmentId(assessment_id), edits, &actor) {
        Ok(assessment) => {
            let view = AssessmentStatusView::from_assessment(&assessment);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => workflow_rejection(error),
    }
}

pub(crate) async fn commit_impact_handler<R, L>(
    State(service): State<Arc<AssessmentWorkflowService<R, L>>>,
    Path(assessment_id): Path<String>,
    axum::Json(request): axum::Json<CommitImpactRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    L: ApprovalLedger + 'static,
{
    let actor = match request.actor.into_profile() {
        Ok(profile) => profile,
        Err(error) => return claims_rejection(error),
    };

    match service.commit_impact(&AssessmentId(assessment_id), request.facts, &actor) {
        Ok(assessment) => {
            let view = AssessmentStatusView::from_assessment(&assessment);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => workflow_rejection(error),
    }
}

pub(crate) async fn action_handler<R, L>(
    State(service): State<Arc<AssessmentWorkflowService<R, L>>>,
    Path(assessment_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    L: ApprovalLedger + 'static,
{
    let actor = match request.actor.into_profile() {
        Ok(profile) => profile,
        Err(error) => return claims_rejection(error),
    };

    match service.transition(&AssessmentId(assessment_id), request.action, &actor) {
        Ok(assessment) => {
            let view = AssessmentStatusView::from_assessment(&assessment);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => workflow_rejection(error),
    }
}

fn claims_rejection(error: AccessError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}

fn workflow_rejection(error: WorkflowError) -> Response {
    let status = match &error {
        WorkflowError::NotFound => StatusCode::NOT_FOUND,
        WorkflowError::Permission { .. } | WorkflowError::OutOfScope { .. } => {
            StatusCode::FORBIDDEN
        }
        WorkflowError::Conflict { .. } => StatusCode::CONFLICT,
        WorkflowError::UnknownUnit(_)
        | WorkflowError::NotEditable(_)
        | WorkflowError::DuplicateItem(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::AuditReconciliation(_)
        | WorkflowError::Repository(_)
        | WorkflowError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
