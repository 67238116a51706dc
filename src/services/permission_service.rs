//! Domain service for the PIN permission matrix and its access grants.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::ActionKey;

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("Username does not match the signed-in admin")]
    InvalidUsername,

    #[error("Invalid or expired verification code")]
    InvalidToken,

    #[error("Email verification required")]
    AccessRequired,

    #[error("Email verification expired")]
    AccessExpired,

    #[error("PIN must be at least {0} characters")]
    WeakPin(usize),

    #[error("Admin not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for PermissionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for PermissionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result of an access request. The code is only echoed back when the
/// server is configured to expose verification codes.
#[derive(Debug, Clone, Serialize)]
pub struct AccessRequest {
    pub email: String,
    pub expires_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// `true` while an access grant deadline lies in the future.
#[must_use]
pub fn check_access(grant_expires: Option<DateTime<Utc>>) -> bool {
    grant_expires.is_some_and(|until| Utc::now() < until)
}

/// Fails unless the session holds a live access grant.
///
/// # Errors
///
/// [`PermissionError::AccessRequired`] without a grant,
/// [`PermissionError::AccessExpired`] once it has lapsed.
pub fn ensure_access(grant_expires: Option<DateTime<Utc>>) -> Result<(), PermissionError> {
    match grant_expires {
        None => Err(PermissionError::AccessRequired),
        Some(until) if Utc::now() >= until => Err(PermissionError::AccessExpired),
        Some(_) => Ok(()),
    }
}

#[async_trait::async_trait]
pub trait PermissionService: Send + Sync {
    /// Whether `key` needs a step-up PIN. Unconfigured pairs do not.
    async fn is_pin_required(&self, key: ActionKey) -> Result<bool, PermissionError>;

    async fn set_permission(
        &self,
        key: ActionKey,
        requires_pin: bool,
        updated_by: Option<i32>,
    ) -> Result<(), PermissionError>;

    /// Applies every `entity.action` entry of `requirements` and returns how
    /// many were written. Malformed keys are skipped.
    async fn bulk_set(
        &self,
        requirements: &BTreeMap<String, bool>,
        updated_by: Option<i32>,
    ) -> Result<usize, PermissionError>;

    /// The full matrix: every entity and action, overlaid with stored values.
    async fn list(&self) -> Result<BTreeMap<String, bool>, PermissionError>;

    /// Issues an emailed access code to the signed-in admin.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::InvalidUsername`] when `username` is not
    /// the admin's own.
    async fn request_access(
        &self,
        admin_id: i32,
        username: &str,
    ) -> Result<AccessRequest, PermissionError>;

    /// Redeems a code and returns the deadline of the resulting grant.
    async fn verify_access(
        &self,
        admin_id: i32,
        code: &str,
    ) -> Result<DateTime<Utc>, PermissionError>;

    async fn update_permissions(
        &self,
        admin_id: i32,
        grant_expires: Option<DateTime<Utc>>,
        requirements: &BTreeMap<String, bool>,
    ) -> Result<BTreeMap<String, bool>, PermissionError>;

    /// Replaces the admin's management PIN. The caller clears the grant.
    async fn change_pin(
        &self,
        admin_id: i32,
        grant_expires: Option<DateTime<Utc>>,
        new_pin: &str,
    ) -> Result<(), PermissionError>;
}
