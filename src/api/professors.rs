use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, DeleteResponse, Guarded, PinRequest};
use crate::models::{ProfessorInput, Professor};
use crate::services::{Actor, AdminProfile};

/// GET /professors
pub async fn list_professors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Professor>>>, ApiError> {
    let items = state.shared.registry_service.list_professors().await?;
    Ok(Json(ApiResponse::success(items)))
}

/// POST /professors
pub async fn create_professor(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Json(payload): Json<Guarded<ProfessorInput>>,
) -> Result<Json<ApiResponse<Professor>>, ApiError> {
    let actor = Actor::new(admin.id, payload.pin);
    let created = state
        .shared
        .registry_service
        .create_professor(&actor, payload.input)
        .await?;
    Ok(Json(ApiResponse::success(created)))
}

/// POST /professors/{public_id}/update
pub async fn update_professor(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Path(public_id): Path<String>,
    Json(payload): Json<Guarded<ProfessorInput>>,
) -> Result<Json<ApiResponse<Professor>>, ApiError> {
    let actor = Actor::new(admin.id, payload.pin);
    let updated = state
        .shared
        .registry_service
        .update_professor(&actor, &public_id, payload.input)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// POST /professors/{public_id}/delete
pub async fn delete_professor(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Path(public_id): Path<String>,
    payload: Option<Json<PinRequest>>,
) -> Result<Json<ApiResponse<DeleteResponse<Professor>>>, ApiError> {
    let Json(PinRequest { pin }) = payload.unwrap_or_default();
    let actor = Actor::new(admin.id, pin);
    let remaining = state
        .shared
        .registry_service
        .delete_professor(&actor, &public_id)
        .await?;
    Ok(Json(ApiResponse::success(DeleteResponse::ok(remaining))))
}
