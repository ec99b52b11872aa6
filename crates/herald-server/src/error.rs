//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use herald_core::error::HeraldError;
use serde::Serialize;
use std::fmt;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

// Convert from herald-core errors
impl From<HeraldError> for ApiError {
    fn from(err: HeraldError) -> Self {
        let code = err.code().as_str();

        match err {
            HeraldError::Validation { message, .. } => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, code, message)
            }
            HeraldError::Database { message, .. } => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                format!("Database error: {}", message),
            ),
            HeraldError::UnsupportedFeature {
                feature, message, ..
            } => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
                .with_details(serde_json::json!({ "feature": feature })),
            HeraldError::MalformedRule {
                message,
                notification_type,
                ..
            } => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
                .with_details(serde_json::json!({ "notification_type": notification_type })),
            other => ApiError::internal(other.to_string()),
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::ErrorCode;

    #[test]
    fn test_validation_maps_to_422() {
        let err: ApiError = HeraldError::missing_field("user_id").into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, "VAL_002");
    }

    #[test]
    fn test_rule_errors_map_to_500_with_details() {
        let err: ApiError = HeraldError::malformed_rule(ErrorCode::RuleUnresolvedPath, "no path")
            .for_rule("WELCOME_EMAIL")
            .into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "RULE_001");
        assert_eq!(
            err.details,
            Some(serde_json::json!({ "notification_type": "WELCOME_EMAIL" }))
        );
    }

    #[test]
    fn test_database_error_keeps_code() {
        let err: ApiError = HeraldError::connection("refused").into();
        assert_eq!(err.code, "DB_001");
        assert!(err.message.contains("refused"));
    }

    #[test]
    fn test_other_errors_map_to_internal() {
        let err: ApiError = HeraldError::Configuration("bad port".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "INTERNAL_ERROR");
        assert!(err.message.contains("bad port"));
    }
}
