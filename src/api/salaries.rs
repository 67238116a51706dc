use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, DeleteResponse, Guarded, PinRequest};
use crate::models::{SalaryInput, Salary};
use crate::services::{Actor, AdminProfile};

/// GET /salaries
pub async fn list_salaries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Salary>>>, ApiError> {
    let items = state.shared.registry_service.list_salaries().await?;
    Ok(Json(ApiResponse::success(items)))
}

/// POST /salaries
pub async fn create_salary(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Json(payload): Json<Guarded<SalaryInput>>,
) -> Result<Json<ApiResponse<Salary>>, ApiError> {
    let actor = Actor::new(admin.id, payload.pin);
    let created = state
        .shared
        .registry_service
        .create_salary(&actor, payload.input)
        .await?;
    Ok(Json(ApiResponse::success(created)))
}

/// POST /salaries/{public_id}/update
pub async fn update_salary(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Path(public_id): Path<String>,
    Json(payload): Json<Guarded<SalaryInput>>,
) -> Result<Json<ApiResponse<Salary>>, ApiError> {
    let actor = Actor::new(admin.id, payload.pin);
    let updated = state
        .shared
        .registry_service
        .update_salary(&actor, &public_id, payload.input)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// POST /salaries/{public_id}/delete
pub async fn delete_salary(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Path(public_id): Path<String>,
    payload: Option<Json<PinRequest>>,
) -> Result<Json<ApiResponse<DeleteResponse<Salary>>>, ApiError> {
    let Json(PinRequest { pin }) = payload.unwrap_or_default();
    let actor = Actor::new(admin.id, pin);
    let remaining = state
        .shared
        .registry_service
        .delete_salary(&actor, &public_id)
        .await?;
    Ok(Json(ApiResponse::success(DeleteResponse::ok(remaining))))
}
