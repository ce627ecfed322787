use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

/// Application-level failure taxonomy. Persistence and IO detail never
/// reaches the wire: it is logged here and clients see an opaque code.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{entity} not found (id={id})")]
    NotFound { entity: &'static str, id: i64 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound { entity, id } => HttpResponse::NotFound()
                .json(json!({ "message": format!("{} not found", entity), "id": id })),
            AppError::Validation(msg) => {
                HttpResponse::BadRequest().json(json!({ "message": msg }))
            }
            AppError::Unauthorized => {
                HttpResponse::Unauthorized().json(json!({ "message": "Unauthorized" }))
            }
            AppError::Forbidden => {
                HttpResponse::Forbidden().json(json!({ "message": "Forbidden" }))
            }
            AppError::Database(e) => {
                error!("persistence failure: {}", e);
                HttpResponse::InternalServerError().json(json!({ "error": "persistence_failure" }))
            }
            AppError::Io(e) => {
                error!("io failure: {}", e);
                HttpResponse::InternalServerError().json(json!({ "error": "io_failure" }))
            }
            AppError::Internal(msg) => {
                error!("internal failure: {}", msg);
                HttpResponse::InternalServerError().json(json!({ "error": "internal_failure" }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::NotFound { entity: "Task", id: 7 };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn database_error_body_is_opaque() {
        let err = AppError::Database(sqlx::Error::RowNotFound);
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
