use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{session_deadline, store_deadline};
use super::{ApiError, ApiResponse, AppState, StatusResponse};
use crate::constants::session as keys;
use crate::db::timestamp;
use crate::services::permission_service::check_access;
use crate::services::{AccessRequest, AdminProfile};

#[derive(Serialize)]
pub struct MatrixResponse {
    pub permissions: BTreeMap<String, bool>,
    pub access_granted: bool,
}

#[derive(Deserialize)]
pub struct RequestAccessPayload {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyAccessPayload {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Serialize)]
pub struct AccessStatus {
    pub access_granted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePermissionsPayload {
    #[serde(default)]
    pub permissions: Option<BTreeMap<String, bool>>,
}

#[derive(Deserialize)]
pub struct ChangePinPayload {
    #[serde(default, alias = "new_pin")]
    pub pin: Option<String>,
}

fn access_status(deadline: Option<chrono::DateTime<chrono::Utc>>) -> AccessStatus {
    let access_granted = check_access(deadline);
    AccessStatus {
        access_granted,
        expires_at: deadline.filter(|_| access_granted).map(timestamp),
    }
}

/// GET /permissions
pub async fn get_matrix(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<MatrixResponse>>, ApiError> {
    let permissions = state.shared.permission_service.list().await?;
    let deadline = session_deadline(&session, keys::PERMISSIONS_ACCESS_EXPIRES).await?;

    Ok(Json(ApiResponse::success(MatrixResponse {
        permissions,
        access_granted: check_access(deadline),
    })))
}

/// GET /permissions/access
pub async fn check(session: Session) -> Result<Json<ApiResponse<AccessStatus>>, ApiError> {
    let deadline = session_deadline(&session, keys::PERMISSIONS_ACCESS_EXPIRES).await?;
    Ok(Json(ApiResponse::success(access_status(deadline))))
}

/// POST /permissions/request-access
pub async fn request_access(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Json(payload): Json<RequestAccessPayload>,
) -> Result<Json<ApiResponse<AccessRequest>>, ApiError> {
    let username = payload
        .username
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::MissingFields(vec!["username".to_string()]))?;

    let request = state
        .shared
        .permission_service
        .request_access(admin.id, &username)
        .await?;

    Ok(Json(ApiResponse::success(request)))
}

/// POST /permissions/verify-access
pub async fn verify_access(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    session: Session,
    Json(payload): Json<VerifyAccessPayload>,
) -> Result<Json<ApiResponse<AccessStatus>>, ApiError> {
    let code = payload
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::MissingFields(vec!["code".to_string()]))?;

    let deadline = state
        .shared
        .permission_service
        .verify_access(admin.id, &code)
        .await?;
    store_deadline(&session, keys::PERMISSIONS_ACCESS_EXPIRES, Some(deadline)).await?;

    Ok(Json(ApiResponse::success(access_status(Some(deadline)))))
}

/// POST /permissions
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    session: Session,
    Json(payload): Json<UpdatePermissionsPayload>,
) -> Result<Json<ApiResponse<BTreeMap<String, bool>>>, ApiError> {
    let requirements = payload
        .permissions
        .ok_or_else(|| ApiError::MissingFields(vec!["permissions".to_string()]))?;
    let deadline = session_deadline(&session, keys::PERMISSIONS_ACCESS_EXPIRES).await?;

    let matrix = state
        .shared
        .permission_service
        .update_permissions(admin.id, deadline, &requirements)
        .await?;

    Ok(Json(ApiResponse::success(matrix)))
}

/// POST /permissions/pin
///
/// A successful change consumes the access grant.
pub async fn change_pin(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    session: Session,
    Json(payload): Json<ChangePinPayload>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    let deadline = session_deadline(&session, keys::PERMISSIONS_ACCESS_EXPIRES).await?;

    state
        .shared
        .permission_service
        .change_pin(admin.id, deadline, payload.pin.as_deref().unwrap_or_default())
        .await?;
    store_deadline(&session, keys::PERMISSIONS_ACCESS_EXPIRES, None).await?;

    Ok(Json(ApiResponse::success(StatusResponse::ok())))
}
