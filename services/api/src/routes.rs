use std::sync::Arc;

use assess_core::access::AccessError;
use assess_core::assessment::{workflow_router, ActorClaims};
use assess_core::budget::BudgetRepository;
use assess_core::hierarchy::fiscal::{FiscalYear, YearFilter};
use assess_core::hierarchy::{ProvinceId, RegionId, UnitId};
use assess_core::reporting::{
    level_rows, rollup_budgets, rollup_impact, rollup_scores, AssessmentSnapshot,
    CategoryRowView, CoverageReportView, DrillError, DrillPath,
};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::infra::{AppState, InMemoryBudgetRepository, WorkflowService};

/// Figures a coverage report can fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[clap(rename_all = "snake_case")]
pub(crate) enum ReportMetric {
    Budget,
    Score,
    Impact,
}

pub(crate) struct ReportContext {
    pub(crate) workflow: Arc<WorkflowService>,
    pub(crate) budgets: Arc<InMemoryBudgetRepository>,
}

pub(crate) fn with_platform_routes(
    workflow: Arc<WorkflowService>,
    reports: Arc<ReportContext>,
) -> axum::Router {
    workflow_router(workflow)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .merge(
            axum::Router::new()
                .route(
                    "/api/v1/reports/coverage",
                    axum::routing::post(coverage_report_endpoint),
                )
                .with_state(reports),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct CoverageReportRequest {
    pub(crate) metric: ReportMetric,
    /// Stored fiscal year; omitted means all years.
    #[serde(default)]
    pub(crate) fiscal_year: Option<i32>,
    pub(crate) actor: ActorClaims,
    #[serde(default)]
    pub(crate) region: Option<String>,
    #[serde(default)]
    pub(crate) province: Option<String>,
    #[serde(default)]
    pub(crate) unit: Option<String>,
}

pub(crate) async fn coverage_report_endpoint(
    State(context): State<Arc<ReportContext>>,
    Json(request): Json<CoverageReportRequest>,
) -> Response {
    let actor = match request.actor.into_profile() {
        Ok(profile) => profile,
        Err(error) => return claims_rejection(error),
    };

    let directory = context.workflow.directory();
    let mut path = DrillPath::start_for(&actor, directory);
    if let Some(region) = request.region {
        if path.region().is_none() {
            if let Err(error) = path.enter_region(&actor, directory, RegionId(region)) {
                return drill_rejection(error);
            }
        }
    }
    if let Some(province) = request.province {
        if path.province().is_none() {
            if let Err(error) = path.enter_province(&actor, directory, ProvinceId(province)) {
                return drill_rejection(error);
            }
        }
    }
    if let Some(unit) = request.unit {
        if path.unit().is_none() {
            if let Err(error) = path.enter_unit(&actor, directory, UnitId(unit)) {
                return drill_rejection(error);
            }
        }
    }

    let filter = match request.fiscal_year {
        Some(year) => YearFilter::One(FiscalYear(year)),
        None => YearFilter::All,
    };

    let snapshots: Vec<AssessmentSnapshot> = match context.workflow.list(filter) {
        Ok(assessments) => assessments.iter().map(AssessmentSnapshot::from).collect(),
        Err(error) => return internal_rejection(error.to_string()),
    };

    let table = match request.metric {
        ReportMetric::Budget => match context.budgets.for_year(filter) {
            Ok(records) => rollup_budgets(directory, &records, filter),
            Err(error) => return internal_rejection(error.to_string()),
        },
        ReportMetric::Score => rollup_scores(directory, &snapshots, filter),
        ReportMetric::Impact => rollup_impact(directory, &snapshots, filter),
    };

    let rows = level_rows(directory, &table, &path);
    let category_rows = match path.unit() {
        Some(unit) => latest_approved_categories(&snapshots, unit, &context),
        None => Vec::new(),
    };

    let view = CoverageReportView {
        level: path.level(),
        level_label: path.level().label(),
        rows,
        category_rows,
    };
    (StatusCode::OK, Json(view)).into_response()
}

fn latest_approved_categories(
    snapshots: &[AssessmentSnapshot],
    unit: &UnitId,
    context: &ReportContext,
) -> Vec<CategoryRowView> {
    let latest = snapshots
        .iter()
        .filter(|snapshot| snapshot.unit == *unit)
        .filter(|snapshot| snapshot.status.counts_as_approved())
        .max_by_key(|snapshot| snapshot.sequence);
    let Some(latest) = latest else {
        return Vec::new();
    };
    match context.workflow.get(&latest.id) {
        Ok(assessment) => CategoryRowView::rows_for(&assessment),
        Err(_) => Vec::new(),
    }
}

fn claims_rejection(error: AccessError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

fn drill_rejection(error: DrillError) -> Response {
    let status = match &error {
        DrillError::AccessDenied(_) => StatusCode::FORBIDDEN,
        DrillError::UnknownTarget(_)
        | DrillError::AtHomeLevel
        | DrillError::WrongLevel { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

fn internal_rejection(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use assess_core::access::{Profile, Role, Scope};
    use assess_core::assessment::{
        AssessmentPeriod, AssessmentWorkflowService, ItemEdit, ItemStatus, SecurityCategory,
        WorkflowAction, WorkflowRules,
    };
    use assess_core::budget::BudgetService;
    use crate::infra::{
        seeded_directory, InMemoryApprovalLedger, InMemoryAssessmentRepository,
        InMemoryBudgetRepository,
    };

    fn context_with_data() -> Arc<ReportContext> {
        let directory = seeded_directory();
        let workflow = Arc::new(AssessmentWorkflowService::new(
            Arc::new(InMemoryAssessmentRepository::default()),
            Arc::new(InMemoryApprovalLedger::default()),
            directory.clone(),
            WorkflowRules::default(),
        ));
        let budgets = Arc::new(InMemoryBudgetRepository::default());

        let admin = Profile::new("admin", "Admin", Role::CentralAdmin, Scope::National)
            .expect("valid profile");
        let provincial = Profile::new(
            "prov",
            "Provincial",
            Role::ProvincialApprover,
            Scope::Province(assess_core::hierarchy::ProvinceId("p-river".into())),
        )
        .expect("valid profile");

        let assessment = workflow
            .create(
                UnitId("h-river-general".into()),
                FiscalYear(2026),
                AssessmentPeriod::FirstRound,
                &admin,
            )
            .expect("cycle opens");
        let edits = SecurityCategory::ordered()
            .into_iter()
            .map(|category| ItemEdit {
                category,
                status: ItemStatus::Pass,
                note: None,
            })
            .collect();
        workflow
            .commit_items(&assessment.id, edits, &admin)
            .expect("items commit");
        workflow
            .transition(&assessment.id, WorkflowAction::Submit, &admin)
            .expect("submit");
        workflow
            .transition(&assessment.id, WorkflowAction::ApproveProvincial, &provincial)
            .expect("approve");

        let budget_service = BudgetService::new(budgets.clone());
        budget_service
            .save_plan(
                &UnitId("h-river-general".into()),
                FiscalYear(2026),
                SecurityCategory::ordered()
                    .into_iter()
                    .map(|category| (category, 1_000.0))
                    .collect(),
            )
            .expect("plan saves");

        Arc::new(ReportContext { workflow, budgets })
    }

    fn admin_claims() -> ActorClaims {
        serde_json::from_value(json!({
            "user_id": "admin",
            "display_name": "Admin",
            "role": "central_admin",
            "scope": { "level": "national" }
        }))
        .expect("claims parse")
    }

    #[tokio::test]
    async fn score_report_rolls_up_to_regions() {
        let context = context_with_data();
        let request = CoverageReportRequest {
            metric: ReportMetric::Score,
            fiscal_year: None,
            actor: admin_claims(),
            region: None,
            province: None,
            unit: None,
        };

        let response =
            coverage_report_endpoint(State(context), Json(request)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn budget_report_respects_drill_position() {
        let context = context_with_data();
        let request = CoverageReportRequest {
            metric: ReportMetric::Budget,
            fiscal_year: Some(2026),
            actor: admin_claims(),
            region: Some("r01".into()),
            province: Some("p-river".into()),
            unit: None,
        };

        let response =
            coverage_report_endpoint(State(context), Json(request)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn foreign_region_is_rejected_for_scoped_callers() {
        let context = context_with_data();
        let provincial_claims: ActorClaims = serde_json::from_value(json!({
            "user_id": "prov",
            "display_name": "Provincial",
            "role": "provincial_approver",
            "scope": { "level": "province", "id": "p-river" }
        }))
        .expect("claims parse");

        let request = CoverageReportRequest {
            metric: ReportMetric::Budget,
            fiscal_year: None,
            actor: provincial_claims,
            region: None,
            province: None,
            unit: Some("h-coastal-general".into()),
        };

        let response =
            coverage_report_endpoint(State(context), Json(request)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
