use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A survey answer rejected by the engine. The payload is the stable
    /// reason code: "range", "choice", "type", "length" or "limit".
    #[error("Answer rejected: {0}")]
    AnswerRejected(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    /// Optimistic-lock or current-question mismatch on a survey session.
    /// Carries the current session state so the client can resynchronize.
    #[error("Conflict: stale session state")]
    VersionConflict(serde_json::Value),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                error_body(
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg,
                )
            }
            AppError::AnswerRejected(reason) => {
                log::warn!("Answer rejected: {reason}");
                HttpResponse::BadRequest().json(json!({
                    "success": false,
                    "error": {
                        "code": "ANSWER_REJECTED",
                        "reason": reason
                    }
                }))
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                error_body(actix_web::http::StatusCode::UNAUTHORIZED, "AUTH_ERROR", msg)
            }
            AppError::NotFound(msg) => {
                error_body(actix_web::http::StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                error_body(
                    actix_web::http::StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "Forbidden",
                )
            }
            AppError::VersionConflict(state) => HttpResponse::Conflict().json(json!({
                "success": false,
                "error": {
                    "code": "VERSION_CONFLICT",
                    "message": "Session state has changed"
                },
                "state": state
            })),
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                error_body(
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "EXTERNAL_API_ERROR",
                    msg,
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                error_body(
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error",
                )
            }
            AppError::MigrateError(err) => {
                log::error!("Migration error: {err}");
                error_body(
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "MIGRATION_ERROR",
                    "Migration error",
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                error_body(
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error",
                )
            }
        }
    }
}

fn error_body(
    status_code: actix_web::http::StatusCode,
    error_code: &str,
    message: &str,
) -> HttpResponse {
    HttpResponse::build(status_code).json(json!({
        "success": false,
        "error": {
            "code": error_code,
            "message": message
        }
    }))
}
