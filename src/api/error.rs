use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ErrorBody;
use crate::services::{AuthError, PermissionError, RegistryError, SettingsError, StepUpError};

/// Message shared by rate limiting and lockout so a locked account looks
/// the same as a throttled address.
pub const TOO_MANY_ATTEMPTS_MESSAGE: &str = "Too many attempts. Please try again later.";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    /// 404 with a resource-specific code, e.g. `class_not_found`.
    MissingResource { code: &'static str, message: String },

    DatabaseError(String),

    /// 400 with a specific code, e.g. `invalid_course`.
    ValidationError { code: &'static str, message: String },

    MissingFields(Vec<String>),

    Conflict(String),

    InternalError(String),

    Unauthorized { code: &'static str, message: String },

    Forbidden { code: &'static str, message: String },

    TooManyRequests,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::MissingResource { code, message } => {
                write!(f, "Not found ({code}): {message}")
            }
            ApiError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            ApiError::ValidationError { code, message } => {
                write!(f, "Validation error ({code}): {message}")
            }
            ApiError::MissingFields(fields) => {
                write!(f, "Missing fields: {}", fields.join(", "))
            }
            ApiError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {msg}"),
            ApiError::Unauthorized { code, message } => {
                write!(f, "Unauthorized ({code}): {message}")
            }
            ApiError::Forbidden { code, message } => write!(f, "Forbidden ({code}): {message}"),
            ApiError::TooManyRequests => f.write_str(TOO_MANY_ATTEMPTS_MESSAGE),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) | ApiError::MissingResource { .. } => StatusCode::NOT_FOUND,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::ValidationError { .. } | ApiError::MissingFields(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::DatabaseError(_) => "database_error",
            ApiError::InternalError(_) => "internal_error",
            ApiError::MissingFields(_) => "missing_fields",
            ApiError::Conflict(_) => "duplicate",
            ApiError::TooManyRequests => "too_many_attempts",
            ApiError::ValidationError { code, .. }
            | ApiError::MissingResource { code, .. }
            | ApiError::Unauthorized { code, .. }
            | ApiError::Forbidden { code, .. } => *code,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, fields) = match self {
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (Some("A database error occurred".to_string()), None)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (Some("An internal error occurred".to_string()), None)
            }
            ApiError::MissingFields(fields) => {
                (Some("Missing required fields".to_string()), Some(fields))
            }
            ApiError::TooManyRequests => (Some(TOO_MANY_ATTEMPTS_MESSAGE.to_string()), None),
            ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::ValidationError { message, .. }
            | ApiError::MissingResource { message, .. }
            | ApiError::Unauthorized { message, .. }
            | ApiError::Forbidden { message, .. } => (Some(message), None),
        };

        let body = ErrorBody {
            success: false,
            error: code.to_string(),
            message,
            fields,
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(format!("{err:#}"))
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ApiError::InternalError(format!("Session error: {err}"))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized {
                code: "invalid_credentials",
                message: err.to_string(),
            },
            AuthError::TooManyAttempts => ApiError::TooManyRequests,
            AuthError::InvalidTwoFactor => ApiError::Unauthorized {
                code: "invalid_2fa",
                message: err.to_string(),
            },
            AuthError::AccountPending => ApiError::forbidden("account_pending", err.to_string()),
            AuthError::AccountRejected => ApiError::forbidden("account_rejected", err.to_string()),
            AuthError::WeakPassword(_) => ApiError::validation("weak_password", err.to_string()),
            AuthError::Duplicate => ApiError::Conflict(err.to_string()),
            AuthError::InvalidToken => ApiError::validation("invalid_token", err.to_string()),
            AuthError::MissingFields(fields) => ApiError::MissingFields(fields),
            AuthError::NotFound => ApiError::NotFound(err.to_string()),
            AuthError::Database(msg) => ApiError::DatabaseError(msg),
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<StepUpError> for ApiError {
    fn from(err: StepUpError) -> Self {
        match err {
            StepUpError::MissingPin => ApiError::forbidden("missing_pin", err.to_string()),
            StepUpError::InvalidPin => ApiError::forbidden("invalid_pin", err.to_string()),
            StepUpError::SettingsLocked => ApiError::forbidden("settings_locked", err.to_string()),
            StepUpError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::InvalidUsername => {
                ApiError::forbidden("invalid_username", err.to_string())
            }
            PermissionError::InvalidToken => ApiError::validation("invalid_token", err.to_string()),
            PermissionError::AccessRequired => {
                ApiError::forbidden("access_required", err.to_string())
            }
            PermissionError::AccessExpired => {
                ApiError::forbidden("access_expired", err.to_string())
            }
            PermissionError::WeakPin(_) => ApiError::validation("weak_pin", err.to_string()),
            PermissionError::NotFound => ApiError::NotFound(err.to_string()),
            PermissionError::Database(msg) => ApiError::DatabaseError(msg),
            PermissionError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound => ApiError::NotFound(err.to_string()),
            RegistryError::MissingFields(fields) => ApiError::MissingFields(fields),
            RegistryError::InvalidCourse => ApiError::validation("invalid_course", err.to_string()),
            RegistryError::InvalidRefs => ApiError::validation("invalid_refs", err.to_string()),
            RegistryError::Duplicate => ApiError::Conflict(err.to_string()),
            RegistryError::InvalidStatus(_) => {
                ApiError::validation("invalid_status", err.to_string())
            }
            RegistryError::StepUp(inner) => inner.into(),
            RegistryError::Database(msg) => ApiError::DatabaseError(msg),
            RegistryError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::MissingFields(fields) => ApiError::MissingFields(fields),
            SettingsError::InvalidKey(_) => ApiError::validation("invalid_key", err.to_string()),
            SettingsError::InvalidValue(_) => {
                ApiError::validation("invalid_value", err.to_string())
            }
            SettingsError::WeakPin(_) => ApiError::validation("weak_pin", err.to_string()),
            SettingsError::Database(msg) => ApiError::DatabaseError(msg),
            SettingsError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{resource} {id} not found"))
    }

    pub fn validation(code: &'static str, msg: impl Into<String>) -> Self {
        ApiError::ValidationError {
            code,
            message: msg.into(),
        }
    }

    pub fn missing_resource(code: &'static str, msg: impl Into<String>) -> Self {
        ApiError::MissingResource {
            code,
            message: msg.into(),
        }
    }

    pub fn forbidden(code: &'static str, msg: impl Into<String>) -> Self {
        ApiError::Forbidden {
            code,
            message: msg.into(),
        }
    }

    pub fn unauthenticated() -> Self {
        ApiError::Unauthorized {
            code: "unauthorized",
            message: "Not authenticated".to_string(),
        }
    }

    pub fn csrf_invalid() -> Self {
        ApiError::forbidden("csrf_token_invalid", "Invalid or missing CSRF token")
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_fields_are_listed() {
        let (status, body) = render(
            RegistryError::MissingFields(vec!["name".to_string()]).into(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "missing_fields");
        assert_eq!(body["fields"], serde_json::json!(["name"]));
    }

    #[tokio::test]
    async fn internal_details_stay_server_side() {
        let (status, body) = render(ApiError::DatabaseError("table exploded".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "database_error");
        assert!(!body.to_string().contains("exploded"));
    }

    #[tokio::test]
    async fn lockout_and_rate_limit_share_a_message() {
        let (status, body) = render(AuthError::TooManyAttempts.into()).await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "too_many_attempts");
        assert_eq!(body["message"], TOO_MANY_ATTEMPTS_MESSAGE);
    }

    #[tokio::test]
    async fn wrong_second_factor_is_unauthorized() {
        let (status, body) = render(AuthError::InvalidTwoFactor.into()).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_2fa");
    }

    #[tokio::test]
    async fn resource_specific_not_found() {
        let (status, body) =
            render(ApiError::missing_resource("class_not_found", "Class C-9 not found")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "class_not_found");
        assert_eq!(body["message"], "Class C-9 not found");
    }

    #[test]
    fn step_up_failures_are_forbidden() {
        let missing: ApiError = RegistryError::StepUp(StepUpError::MissingPin).into();
        assert_eq!(missing.status(), StatusCode::FORBIDDEN);
        assert_eq!(missing.code(), "missing_pin");

        let invalid: ApiError = StepUpError::InvalidPin.into();
        assert_eq!(invalid.code(), "invalid_pin");
    }

    #[test]
    fn codes_for_conflicts_and_refs() {
        assert_eq!(ApiError::from(RegistryError::Duplicate).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(RegistryError::Duplicate).code(), "duplicate");
        assert_eq!(ApiError::from(RegistryError::InvalidRefs).code(), "invalid_refs");
        assert_eq!(
            ApiError::from(RegistryError::InvalidStatus("late".into())).code(),
            "invalid_status"
        );
        assert_eq!(
            ApiError::from(PermissionError::AccessRequired).code(),
            "access_required"
        );
    }
}
