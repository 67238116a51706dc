use axum::{
    Extension, Json,
    extract::{Path, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::client_ip::ClientIp;
use super::{ApiError, ApiResponse, AppState, StatusResponse, csrf};
use crate::constants::session as keys;
use crate::services::{
    AdminProfile, AuthError, LoginAttempt, LoginOutcome, RequestDecision, SignupRequest,
    TwoFactorChallenge,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "email", alias = "identifier")]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, alias = "code")]
    pub two_factor_code: Option<String>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub admin: AdminProfile,
    pub csrf_token: String,
}

/// Second login step pending. The code itself is only echoed when
/// verification codes are exposed.
#[derive(Serialize)]
pub struct TwoFactorResponse {
    pub two_factor_required: bool,
    pub expires_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Session(SessionResponse),
    TwoFactor(TwoFactorResponse),
}

#[derive(Deserialize)]
pub struct LoginCodeRequest {
    #[serde(default, alias = "email", alias = "identifier")]
    pub username: Option<String>,
}

#[derive(Serialize)]
pub struct LoginCodeResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Deserialize)]
pub struct SignupPayload {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default, alias = "username", alias = "email")]
    pub identifier: Option<String>,
}

#[derive(Serialize)]
pub struct ForgotPasswordResponse {
    pub status: &'static str,
    /// Present only when verification codes are exposed for development.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct HandleRequestPayload {
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves the session to a live admin and exposes it as an
/// [`AdminProfile`] extension. Sessions pointing at deleted admins are
/// flushed.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(admin_id) = session.get::<i32>(keys::ADMIN_ID).await? else {
        return Err(ApiError::unauthenticated());
    };

    let Some(admin) = state.shared.auth_service.current_admin(admin_id).await? else {
        session.flush().await?;
        return Err(ApiError::unauthenticated());
    };

    tracing::Span::current().record("user_id", admin.public_id.as_str());
    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
///
/// With two-factor login on, a correct password without a code answers
/// `two_factor_required` and parks the mailed code in the session. A wrong
/// code discards it, so the next try starts over with the password.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let challenge = session
        .get::<TwoFactorChallenge>(keys::TWO_FACTOR_CHALLENGE)
        .await?;

    let outcome = state
        .shared
        .auth_service
        .login(LoginAttempt {
            identifier: payload.username.as_deref().unwrap_or_default(),
            password: payload.password.as_deref().unwrap_or_default(),
            ip_address: &ip,
            two_factor_code: payload.two_factor_code.as_deref(),
            challenge: challenge.as_ref(),
        })
        .await;

    let admin = match outcome {
        Ok(LoginOutcome::Authenticated(admin)) => admin,
        Ok(LoginOutcome::TwoFactorRequired(challenge)) => {
            session
                .insert(keys::TWO_FACTOR_CHALLENGE, &challenge)
                .await?;
            return Ok(Json(ApiResponse::success(LoginResponse::TwoFactor(
                two_factor_response(&state, challenge),
            ))));
        }
        Err(AuthError::InvalidTwoFactor) => {
            session
                .remove::<TwoFactorChallenge>(keys::TWO_FACTOR_CHALLENGE)
                .await?;
            return Err(AuthError::InvalidTwoFactor.into());
        }
        Err(err) => return Err(err.into()),
    };

    session
        .remove::<TwoFactorChallenge>(keys::TWO_FACTOR_CHALLENGE)
        .await?;
    session.cycle_id().await?;
    session.insert(keys::ADMIN_ID, admin.id).await?;
    let csrf_token = csrf::regenerate(&session).await?;

    Ok(Json(ApiResponse::success(LoginResponse::Session(
        SessionResponse { admin, csrf_token },
    ))))
}

/// POST /auth/2fa/resend
///
/// Mails a fresh login code. Answers OK whether or not the identifier
/// matched an admin.
pub async fn request_login_code(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    session: Session,
    Json(payload): Json<LoginCodeRequest>,
) -> Result<Json<ApiResponse<LoginCodeResponse>>, ApiError> {
    let challenge = state
        .shared
        .auth_service
        .request_login_code(payload.username.as_deref().unwrap_or_default(), &ip)
        .await?;

    let code = match challenge {
        Some(challenge) => {
            session
                .insert(keys::TWO_FACTOR_CHALLENGE, &challenge)
                .await?;
            two_factor_response(&state, challenge).code
        }
        None => None,
    };

    Ok(Json(ApiResponse::success(LoginCodeResponse {
        status: "ok",
        code,
    })))
}

fn two_factor_response(state: &AppState, challenge: TwoFactorChallenge) -> TwoFactorResponse {
    TwoFactorResponse {
        two_factor_required: true,
        expires_at: challenge.expires_at,
        code: state
            .config()
            .security
            .expose_verification_codes
            .then_some(challenge.code),
    }
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    session: Session,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    state.shared.auth_service.logout(admin.id).await;
    session.flush().await?;
    Ok(Json(ApiResponse::success(StatusResponse::ok())))
}

/// GET /auth/me
pub async fn me(
    Extension(admin): Extension<AdminProfile>,
    session: Session,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let csrf_token = csrf::ensure_token(&session).await?;
    Ok(Json(ApiResponse::success(SessionResponse {
        admin,
        csrf_token,
    })))
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupPayload>,
) -> Result<Json<ApiResponse<AdminProfile>>, ApiError> {
    let admin = state
        .shared
        .auth_service
        .signup(SignupRequest {
            username: payload.username.unwrap_or_default(),
            name: payload.name,
            email: payload.email.unwrap_or_default(),
            password: payload.password.unwrap_or_default(),
        })
        .await?;

    Ok(Json(ApiResponse::success(admin)))
}

/// POST /auth/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    let mut missing = Vec::new();
    if payload.current_password.as_deref().is_none_or(str::is_empty) {
        missing.push("current_password".to_string());
    }
    if payload.new_password.as_deref().is_none_or(str::is_empty) {
        missing.push("new_password".to_string());
    }
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }

    state
        .shared
        .auth_service
        .change_password(
            admin.id,
            payload.current_password.as_deref().unwrap_or_default(),
            payload.new_password.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|err| match err {
            // A wrong current password is a refusal, not a failed login.
            AuthError::InvalidCredentials => {
                ApiError::forbidden("invalid_credentials", "Current password is incorrect")
            }
            other => other.into(),
        })?;

    Ok(Json(ApiResponse::success(StatusResponse::ok())))
}

/// POST /auth/password/forgot
///
/// Answers OK whether or not the identifier matched an admin.
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<ForgotPasswordResponse>>, ApiError> {
    let identifier = payload.identifier.unwrap_or_default();
    if identifier.trim().is_empty() {
        return Err(ApiError::MissingFields(vec!["identifier".to_string()]));
    }

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let token = state
        .shared
        .auth_service
        .request_password_reset(identifier.trim(), Some(ip), user_agent)
        .await?;

    Ok(Json(ApiResponse::success(ForgotPasswordResponse {
        status: "ok",
        token,
    })))
}

/// POST /auth/password/reset
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    let mut missing = Vec::new();
    if payload.token.as_deref().is_none_or(str::is_empty) {
        missing.push("token".to_string());
    }
    if payload.password.as_deref().is_none_or(str::is_empty) {
        missing.push("password".to_string());
    }
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }

    state
        .shared
        .auth_service
        .reset_password(
            payload.token.as_deref().unwrap_or_default(),
            payload.password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(ApiResponse::success(StatusResponse::ok())))
}

/// GET /auth/requests
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<AdminProfile>>>, ApiError> {
    let requests = state.shared.auth_service.list_requests().await?;
    Ok(Json(ApiResponse::success(requests)))
}

/// POST /auth/requests/{public_id}
///
/// Approving or rejecting an account is a settings-level decision and needs
/// the settings unlock.
pub async fn handle_request(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    session: Session,
    Path(public_id): Path<String>,
    Json(payload): Json<HandleRequestPayload>,
) -> Result<Json<ApiResponse<AdminProfile>>, ApiError> {
    let decision = payload
        .decision
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::MissingFields(vec!["decision".to_string()]))?;
    let decision = RequestDecision::parse(decision)
        .ok_or_else(|| ApiError::validation("invalid_value", "Decision must be accept or ignore"))?;

    super::settings::ensure_unlocked(&state, &session, admin.id, payload.pin.as_deref()).await?;

    let handled = state
        .shared
        .auth_service
        .handle_request(admin.id, &public_id, decision)
        .await?;

    Ok(Json(ApiResponse::success(handled)))
}

// ============================================================================
// Helpers
// ============================================================================

/// Reads a millisecond deadline stored in the session.
pub async fn session_deadline(
    session: &Session,
    key: &str,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    Ok(session
        .get::<i64>(key)
        .await?
        .and_then(DateTime::from_timestamp_millis))
}

pub async fn store_deadline(
    session: &Session,
    key: &str,
    deadline: Option<DateTime<Utc>>,
) -> Result<(), ApiError> {
    match deadline {
        Some(at) => session.insert(key, at.timestamp_millis()).await?,
        None => {
            session.remove::<i64>(key).await?;
        }
    }
    Ok(())
}
