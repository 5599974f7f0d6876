use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Table occupied: {0}")]
    TableOccupied(String),

    #[error("Outside service area")]
    OutsideServiceArea,

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

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
}

impl AppError {
    /// 稳定的错误码，前端据此分支（换桌 / 联系店员 等）
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) | AppError::JwtError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden | AppError::PermissionDenied => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::TableOccupied(_) => "TABLE_OCCUPIED",
            AppError::OutsideServiceArea => "OUTSIDE_SERVICE_AREA",
            AppError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            AppError::ExternalApiError(_) | AppError::ReqwestError(_) => "EXTERNAL_API_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (actix_web::http::StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (actix_web::http::StatusCode::UNAUTHORIZED, msg.clone())
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "Session expired, please sign in again".to_string(),
                )
            }
            AppError::NotFound(msg) => (actix_web::http::StatusCode::NOT_FOUND, msg.clone()),
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                (actix_web::http::StatusCode::FORBIDDEN, "Forbidden".to_string())
            }
            AppError::PermissionDenied => {
                log::warn!("Permission denied");
                (
                    actix_web::http::StatusCode::FORBIDDEN,
                    "Permission denied".to_string(),
                )
            }
            AppError::Conflict(msg) | AppError::InvalidTransition(msg) => {
                log::warn!("Conflict: {msg}");
                (actix_web::http::StatusCode::CONFLICT, msg.clone())
            }
            AppError::TableOccupied(msg) => {
                log::info!("Table occupied: {msg}");
                (actix_web::http::StatusCode::CONFLICT, msg.clone())
            }
            AppError::OutsideServiceArea => (
                actix_web::http::StatusCode::FORBIDDEN,
                "Device is outside the store service area".to_string(),
            ),
            AppError::InsufficientStock(msg) => {
                (actix_web::http::StatusCode::CONFLICT, msg.clone())
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                (actix_web::http::StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::ReqwestError(err) => {
                log::error!("HTTP request error: {err}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "Upstream service unavailable".to_string(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_business_outcomes_have_distinct_codes() {
        assert_eq!(AppError::TableOccupied("5".into()).code(), "TABLE_OCCUPIED");
        assert_eq!(AppError::OutsideServiceArea.code(), "OUTSIDE_SERVICE_AREA");
        assert_eq!(
            AppError::InvalidTransition("x".into()).code(),
            "INVALID_TRANSITION"
        );
        assert_eq!(
            AppError::InsufficientStock("x".into()).code(),
            "INSUFFICIENT_STOCK"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::TableOccupied("5".into()).error_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::PermissionDenied.error_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::ValidationError("x".into()).error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::DatabaseError(sea_orm::DbErr::Custom("boom".into()))
                .error_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
