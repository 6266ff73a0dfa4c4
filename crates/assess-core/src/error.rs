use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::assessment::WorkflowError;
use crate::budget::import::BudgetImportError;
use crate::budget::BudgetError;
use crate::config::ConfigError;
use crate::evidence::EvidenceError;
use crate::telemetry::TelemetryError;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Workflow(WorkflowError),
    Budget(BudgetError),
    BudgetImport(BudgetImportError),
    Evidence(EvidenceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Workflow(err) => write!(f, "workflow error: {}", err),
            AppError::Budget(err) => write!(f, "budget error: {}", err),
            AppError::BudgetImport(err) => write!(f, "budget import error: {}", err),
            AppError::Evidence(err) => write!(f, "evidence error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Workflow(err) => Some(err),
            AppError::Budget(err) => Some(err),
            AppError::BudgetImport(err) => Some(err),
            AppError::Evidence(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Workflow(WorkflowError::NotFound)
            | AppError::Evidence(EvidenceError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Workflow(
                WorkflowError::Permission { .. } | WorkflowError::OutOfScope { .. },
            ) => StatusCode::FORBIDDEN,
            AppError::Workflow(WorkflowError::Conflict { .. }) => StatusCode::CONFLICT,
            AppError::Workflow(
                WorkflowError::UnknownUnit(_)
                | WorkflowError::NotEditable(_)
                | WorkflowError::DuplicateItem(_),
            )
            | AppError::Budget(_)
            | AppError::BudgetImport(_)
            | AppError::Evidence(
                EvidenceError::FileTooLarge { .. }
                | EvidenceError::TooManyFiles { .. }
                | EvidenceError::InvalidContentType(_),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Evidence(EvidenceError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Workflow(_)
            | AppError::Evidence(_)
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<WorkflowError> for AppError {
    fn from(value: WorkflowError) -> Self {
        Self::Workflow(value)
    }
}

impl From<BudgetError> for AppError {
    fn from(value: BudgetError) -> Self {
        Self::Budget(value)
    }
}

impl From<BudgetImportError> for AppError {
    fn from(value: BudgetImportError) -> Self {
        Self::BudgetImport(value)
    }
}

impl From<EvidenceError> for AppError {
    fn from(value: EvidenceError) -> Self {
        Self::Evidence(value)
    }
}
