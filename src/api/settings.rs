use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{session_deadline, store_deadline};
use super::{ApiError, ApiResponse, AppState, PinRequest};
use crate::constants::session as keys;
use crate::db::repositories::settings::GroupedSettings;
use crate::db::timestamp;
use crate::services::{AdminProfile, SettingsService};

#[derive(Deserialize)]
pub struct UpdateSettingRequest {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub pin: Option<String>,
}

#[derive(Serialize)]
pub struct UnlockResponse {
    pub unlocked: bool,
    /// Absent when unlocks are not remembered between calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_until: Option<String>,
}

/// Passes when `pin` verifies or the session still holds a live unlock.
/// A fresh unlock is remembered in the session when a TTL is configured.
pub async fn ensure_unlocked(
    state: &AppState,
    session: &Session,
    admin_id: i32,
    pin: Option<&str>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, ApiError> {
    let current = session_deadline(session, keys::SETTINGS_UNLOCKED_UNTIL).await?;

    let until = state
        .shared
        .step_up
        .unlock_settings(admin_id, pin, current)
        .await?;

    if until != current {
        store_deadline(session, keys::SETTINGS_UNLOCKED_UNTIL, until).await?;
    }
    Ok(until)
}

/// GET /settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<GroupedSettings>>, ApiError> {
    let settings = state.shared.settings_service.grouped().await?;
    Ok(Json(ApiResponse::success(settings)))
}

/// POST /settings
pub async fn update_setting(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    session: Session,
    Json(payload): Json<UpdateSettingRequest>,
) -> Result<Json<ApiResponse<GroupedSettings>>, ApiError> {
    let group = payload.group.unwrap_or_default();
    let key = payload.key.unwrap_or_default();

    if SettingsService::is_security_group(&group) {
        ensure_unlocked(&state, &session, admin.id, payload.pin.as_deref()).await?;
    }

    let settings = state
        .shared
        .settings_service
        .update(admin.id, &group, &key, payload.value)
        .await?;

    Ok(Json(ApiResponse::success(settings)))
}

/// POST /settings/unlock
pub async fn unlock(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    session: Session,
    Json(payload): Json<PinRequest>,
) -> Result<Json<ApiResponse<UnlockResponse>>, ApiError> {
    let pin = payload
        .pin
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::MissingFields(vec!["pin".to_string()]))?;

    let until = ensure_unlocked(&state, &session, admin.id, Some(pin)).await?;

    Ok(Json(ApiResponse::success(UnlockResponse {
        unlocked: true,
        unlocked_until: until.map(timestamp),
    })))
}
