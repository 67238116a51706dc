use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, DeleteResponse, Guarded, PinRequest};
use crate::models::{ClassInput, Class};
use crate::services::{Actor, AdminProfile, RegistryError};

/// GET /classes
pub async fn list_classes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Class>>>, ApiError> {
    let items = state.shared.registry_service.list_classes().await?;
    Ok(Json(ApiResponse::success(items)))
}

/// GET /classes/{public_id}
pub async fn get_class(
    State(state): State<Arc<AppState>>,
    Path(public_id): Path<String>,
) -> Result<Json<ApiResponse<Class>>, ApiError> {
    let public_id = public_id.trim();
    if public_id.is_empty() {
        return Err(ApiError::validation("missing_class_id", "Class id is required"));
    }

    match state.shared.registry_service.get_class(public_id).await {
        Ok(class) => Ok(Json(ApiResponse::success(class))),
        Err(RegistryError::NotFound) => Err(ApiError::missing_resource(
            "class_not_found",
            format!("Class {public_id} not found"),
        )),
        Err(err) => Err(err.into()),
    }
}

/// POST /classes
pub async fn create_class(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Json(payload): Json<Guarded<ClassInput>>,
) -> Result<Json<ApiResponse<Class>>, ApiError> {
    let actor = Actor::new(admin.id, payload.pin);
    let created = state
        .shared
        .registry_service
        .create_class(&actor, payload.input)
        .await?;
    Ok(Json(ApiResponse::success(created)))
}

/// POST /classes/{public_id}/update
pub async fn update_class(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Path(public_id): Path<String>,
    Json(payload): Json<Guarded<ClassInput>>,
) -> Result<Json<ApiResponse<Class>>, ApiError> {
    let actor = Actor::new(admin.id, payload.pin);
    let updated = state
        .shared
        .registry_service
        .update_class(&actor, &public_id, payload.input)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// POST /classes/{public_id}/delete
///
/// Deletes the class with its roster, payment plan, invoices and salary statements.
pub async fn delete_class(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Path(public_id): Path<String>,
    payload: Option<Json<PinRequest>>,
) -> Result<Json<ApiResponse<DeleteResponse<Class>>>, ApiError> {
    let Json(PinRequest { pin }) = payload.unwrap_or_default();
    let actor = Actor::new(admin.id, pin);
    let remaining = state
        .shared
        .registry_service
        .delete_class(&actor, &public_id)
        .await?;
    Ok(Json(ApiResponse::success(DeleteResponse::ok(remaining))))
}
