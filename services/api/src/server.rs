use std::sync::atomic::Ordering;
use std::sync::Arc;

use assess_core::assessment::AssessmentWorkflowService;
use assess_core::config::AppConfig;
use assess_core::error::AppError;
use assess_core::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{
    seeded_directory, AppState, InMemoryApprovalLedger, InMemoryAssessmentRepository,
    InMemoryBudgetRepository,
};
use crate::routes::{with_platform_routes, ReportContext};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = seeded_directory();
    let workflow = Arc::new(AssessmentWorkflowService::new(
        Arc::new(InMemoryAssessmentRepository::default()),
        Arc::new(InMemoryApprovalLedger::default()),
        directory,
        config.workflow,
    ));
    let reports = Arc::new(ReportContext {
        workflow: workflow.clone(),
        budgets: Arc::new(InMemoryBudgetRepository::default()),
    });

    let app = with_platform_routes(workflow, reports)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "assessment platform api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
