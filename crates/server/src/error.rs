use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::models::{
    conference::ConferenceError,
    paper::PaperError,
    user::UserError,
};
use services::services::{policy::PolicyError, workflow::WorkflowError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Internal Server Error: {0}")]
    InternalError(String),
}

impl From<ConferenceError> for ApiError {
    fn from(err: ConferenceError) -> Self {
        match err {
            ConferenceError::Database(e) => ApiError::Database(e),
            ConferenceError::NotFound => ApiError::NotFound("Conference not found".into()),
            ConferenceError::DuplicateName => {
                ApiError::Conflict("A conference with this name already exists".into())
            }
            ConferenceError::InvalidTransition { .. } => ApiError::BadRequest(err.to_string()),
            ConferenceError::NotDeletable(_) => ApiError::BadRequest(err.to_string()),
            ConferenceError::VersionConflict => {
                ApiError::Conflict("Conference was modified concurrently, retry".into())
            }
        }
    }
}

impl From<PaperError> for ApiError {
    fn from(err: PaperError) -> Self {
        match err {
            PaperError::Database(e) => ApiError::Database(e),
            PaperError::NotFound => ApiError::NotFound("Paper not found".into()),
            PaperError::DuplicateTitle => {
                ApiError::Conflict("A paper with this title already exists".into())
            }
            PaperError::VersionConflict => {
                ApiError::Conflict("Paper was modified concurrently, retry".into())
            }
            PaperError::CapacityExceeded => {
                ApiError::Conflict("Paper already has the maximum number of reviewers".into())
            }
            PaperError::ReviewerAlreadyAssigned => {
                ApiError::Conflict("Reviewer is already assigned to this paper".into())
            }
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Database(e) => ApiError::Database(e),
            UserError::NotFound => ApiError::NotFound("User not found".into()),
            UserError::DuplicateUsername => ApiError::Conflict("Username already taken".into()),
            UserError::Hashing(e) => ApiError::InternalError(format!("Hashing error: {}", e)),
        }
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Conference(e) => e.into(),
            WorkflowError::Paper(e) => e.into(),
            WorkflowError::User(e) => e.into(),
            WorkflowError::Policy(e) => e.into(),
            WorkflowError::Database(e) => ApiError::Database(e),
            WorkflowError::PhaseMismatch { .. } => ApiError::BadRequest(err.to_string()),
            WorkflowError::IllegalPaperState { .. } => ApiError::BadRequest(err.to_string()),
            WorkflowError::NotPaperAuthor => ApiError::Forbidden(err.to_string()),
            WorkflowError::Validation(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            ApiError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        let error_message = match &self {
            // Never leak driver details to the client
            ApiError::Database(e) => {
                tracing::error!("database error: {}", e);
                "Storage unavailable".to_string()
            }
            ApiError::Conflict(msg)
            | ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::InternalError(msg) => msg.clone(),
        };

        tracing::debug!("request failed: {} {}", error_type, error_message);
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
