// flow-backend/src/error_handler.rs
use crate::storage::StorageError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred. Please try again later.";

/// Every error a handler can answer with. The inner string of a client error
/// is sent to the caller as-is; the detail of a server error only reaches the log.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Database Error: {0}")]
    DatabaseError(String),

    #[error("Pool Error: {0}")]
    PoolError(String),
}

impl ServiceError {
    fn client_message(&self) -> Option<&str> {
        match self {
            ServiceError::BadRequest(msg)
            | ServiceError::Unauthorized(msg)
            | ServiceError::NotFound(msg) => Some(msg),
            ServiceError::InternalServerError(_)
            | ServiceError::DatabaseError(_)
            | ServiceError::PoolError(_) => None,
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(error: StorageError) -> ServiceError {
        match error {
            StorageError::NotFound { .. } => ServiceError::NotFound(error.to_string()),
            StorageError::Conflict(msg) => ServiceError::BadRequest(msg),
            StorageError::Database(e) => ServiceError::DatabaseError(e.to_string()),
            StorageError::Pool(msg) => ServiceError::PoolError(msg),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> ServiceError {
        ServiceError::BadRequest(format!("Validation failed: {}", errors))
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InternalServerError(_)
            | ServiceError::DatabaseError(_)
            | ServiceError::PoolError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let message = match self.client_message() {
            Some(msg) => {
                log::warn!("{} {}", status_code, msg);
                msg
            }
            None => {
                log::error!("{}", self);
                INTERNAL_ERROR_MESSAGE
            }
        };

        HttpResponse::build(status_code).json(json!({
            "status": "error",
            "statusCode": status_code.as_u16(),
            "message": message
        }))
    }
}
