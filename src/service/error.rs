use crate::{error::HttpError, models::taskmodel::TaskStatus};
use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Task {0} not found")]
    TaskNotFound(Uuid),

    #[error("Task {0} cannot move from {1:?} to {2:?}")]
    InvalidStatusTransition(Uuid, TaskStatus, TaskStatus),

    #[error("Task {0} is not open for applications")]
    TaskNotOpen(Uuid),

    #[error("User {0} already has a pending application for task {1}")]
    AlreadyApplied(Uuid, Uuid),

    #[error("Application {0} not found")]
    ApplicationNotFound(Uuid),

    #[error("Application {0} has already been decided")]
    ApplicationNotPending(Uuid),

    #[error("User {0} is not authorized to perform this action on task {1}")]
    UnauthorizedTaskAccess(Uuid, Uuid),

    #[error("No referral code could be issued, please retry")]
    ReferralCodeUnavailable,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        HttpError::new(error.to_string(), status)
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::TaskNotFound(_) | ServiceError::ApplicationNotFound(_) => {
                StatusCode::NOT_FOUND
            }

            ServiceError::InvalidStatusTransition(_, _, _)
            | ServiceError::TaskNotOpen(_)
            | ServiceError::AlreadyApplied(_, _)
            | ServiceError::ApplicationNotPending(_)
            | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::UnauthorizedTaskAccess(_, _) => StatusCode::FORBIDDEN,

            ServiceError::ReferralCodeUnavailable | ServiceError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
