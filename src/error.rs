use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

use crate::handlers::shared::ApiResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Conflict: {0}")]
    BusinessRule(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Internal server error{}", .0.as_ref().map_or("".to_string(), |s| format!(": {}", s)))]
    InternalServerError(Option<String>),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::BusinessRule(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        if status_code.is_server_error() {
            log::error!(
                "Request failed with status {}: {}",
                status_code,
                error_message
            );
        } else {
            log::info!("Request rejected with status {}: {}", status_code, error_message);
        }

        match self {
            AppError::Validation { field, .. } => HttpResponse::build(status_code)
                .json(ApiResponse::error_with_data(field.clone(), &error_message)),
            _ => HttpResponse::build(status_code).json(ApiResponse::<()>::error(&error_message)),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        log::error!("Database error: {}", error);
        AppError::DatabaseError(error)
    }
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        log::error!("Anyhow error: {}", error);

        // Check if this is a sqlx::Error and handle it appropriately
        if error.is::<sqlx::Error>() {
            match error.downcast::<sqlx::Error>() {
                Ok(sqlx_err) => return AppError::DatabaseError(sqlx_err),
                Err(original_error) => {
                    return AppError::InternalServerError(Some(original_error.to_string()));
                }
            }
        }

        AppError::InternalServerError(Some(error.to_string()))
    }
}
