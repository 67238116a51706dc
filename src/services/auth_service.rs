//! Domain service for admin authentication and account lifecycle.
//!
//! Handles login with rate limiting and lockout, signup approval, password
//! changes and password resets. Session state lives in the API layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::entities::admins;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many attempts. Please try again later.")]
    TooManyAttempts,

    #[error("Invalid or expired two-factor authentication code")]
    InvalidTwoFactor,

    #[error("Account is awaiting approval")]
    AccountPending,

    #[error("Account request was rejected")]
    AccountRejected,

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("Username or email already in use")]
    Duplicate,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Missing required fields")]
    MissingFields(Vec<String>),

    #[error("Admin not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Admin DTO for responses. Hashes never leave the service.
#[derive(Debug, Clone, Serialize)]
pub struct AdminProfile {
    #[serde(skip)]
    pub id: i32,
    pub public_id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub status: String,
    pub has_management_pin: bool,
    pub last_login_at: Option<String>,
    pub created_at: String,
}

impl From<admins::Model> for AdminProfile {
    fn from(model: admins::Model) -> Self {
        Self {
            id: model.id,
            public_id: model.public_id,
            username: model.username,
            name: model.name,
            email: model.email,
            status: model.status,
            has_management_pin: model
                .management_pin_hash
                .is_some_and(|hash| !hash.is_empty()),
            last_login_at: model.last_login_at,
            created_at: model.created_at,
        }
    }
}

/// A one-time login code issued after the password check. The API layer
/// keeps it in the session until the code comes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoFactorChallenge {
    pub admin_id: i32,
    pub code: String,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

impl TwoFactorChallenge {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.expires_at
    }

    /// Whether `code` answers this challenge for `admin_id` at `now`.
    #[must_use]
    pub fn accepts(&self, admin_id: i32, code: &str, now: DateTime<Utc>) -> bool {
        let matches: bool = self.code.as_bytes().ct_eq(code.trim().as_bytes()).into();
        matches && self.admin_id == admin_id && !self.is_expired(now)
    }
}

/// Everything a login attempt carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginAttempt<'a> {
    pub identifier: &'a str,
    pub password: &'a str,
    pub ip_address: &'a str,
    /// Code typed by the admin for the second step, if any.
    pub two_factor_code: Option<&'a str>,
    /// Challenge held in the caller's session, if any.
    pub challenge: Option<&'a TwoFactorChallenge>,
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(AdminProfile),
    /// Password accepted. A code was mailed and must be sent back.
    TwoFactorRequired(TwoFactorChallenge),
}

#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub username: String,
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

/// Outcome of an approval decision on a signup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDecision {
    Accept,
    Ignore,
}

impl RequestDecision {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "accept" => Some(Self::Accept),
            "ignore" => Some(Self::Ignore),
            _ => None,
        }
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials for `attempt.identifier` (username or email).
    /// With two-factor login on, a correct password without a code yields
    /// [`LoginOutcome::TwoFactorRequired`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for unknown admins and wrong
    /// passwords, [`AuthError::TooManyAttempts`] when rate limited or locked,
    /// [`AuthError::InvalidTwoFactor`] for a wrong or expired code.
    async fn login(&self, attempt: LoginAttempt<'_>) -> Result<LoginOutcome, AuthError>;

    /// Mails a fresh login code to the admin behind `identifier`. Unknown
    /// identifiers, and a disabled second step, yield `None`.
    async fn request_login_code(
        &self,
        identifier: &str,
        ip_address: &str,
    ) -> Result<Option<TwoFactorChallenge>, AuthError>;

    /// Loads the admin behind a session, if it still exists.
    async fn current_admin(&self, admin_id: i32) -> Result<Option<AdminProfile>, AuthError>;

    async fn logout(&self, admin_id: i32);

    /// Registers a pending admin awaiting approval.
    async fn signup(&self, request: SignupRequest) -> Result<AdminProfile, AuthError>;

    async fn list_requests(&self) -> Result<Vec<AdminProfile>, AuthError>;

    async fn handle_request(
        &self,
        admin_id: i32,
        public_id: &str,
        decision: RequestDecision,
    ) -> Result<AdminProfile, AuthError>;

    /// Changes the admin's password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the current password is
    /// wrong, [`AuthError::WeakPassword`] if the new one is too short.
    async fn change_password(
        &self,
        admin_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Starts a password reset. Unknown identifiers succeed silently. The
    /// token is returned only when verification codes are exposed.
    async fn request_password_reset(
        &self,
        identifier: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<Option<String>, AuthError>;

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError>;
}
