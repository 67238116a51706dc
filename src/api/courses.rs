use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, DeleteResponse, Guarded, PinRequest};
use crate::models::{CourseInput, Course};
use crate::services::{Actor, AdminProfile};

/// GET /courses
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Course>>>, ApiError> {
    let items = state.shared.registry_service.list_courses().await?;
    Ok(Json(ApiResponse::success(items)))
}

/// POST /courses
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Json(payload): Json<Guarded<CourseInput>>,
) -> Result<Json<ApiResponse<Course>>, ApiError> {
    let actor = Actor::new(admin.id, payload.pin);
    let created = state
        .shared
        .registry_service
        .create_course(&actor, payload.input)
        .await?;
    Ok(Json(ApiResponse::success(created)))
}

/// POST /courses/{public_id}/update
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Path(public_id): Path<String>,
    Json(payload): Json<Guarded<CourseInput>>,
) -> Result<Json<ApiResponse<Course>>, ApiError> {
    let actor = Actor::new(admin.id, payload.pin);
    let updated = state
        .shared
        .registry_service
        .update_course(&actor, &public_id, payload.input)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// POST /courses/{public_id}/delete
///
/// Deletes the course together with its classes and everything attached to them.
pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Path(public_id): Path<String>,
    payload: Option<Json<PinRequest>>,
) -> Result<Json<ApiResponse<DeleteResponse<Course>>>, ApiError> {
    let Json(PinRequest { pin }) = payload.unwrap_or_default();
    let actor = Actor::new(admin.id, pin);
    let remaining = state
        .shared
        .registry_service
        .delete_course(&actor, &public_id)
        .await?;
    Ok(Json(ApiResponse::success(DeleteResponse::ok(remaining))))
}
