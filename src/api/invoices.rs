use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, DeleteResponse, Guarded, PinRequest};
use crate::models::{InvoiceInput, Invoice};
use crate::services::{Actor, AdminProfile};

/// GET /invoices
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Invoice>>>, ApiError> {
    let items = state.shared.registry_service.list_invoices().await?;
    Ok(Json(ApiResponse::success(items)))
}

/// POST /invoices
pub async fn create_invoice(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Json(payload): Json<Guarded<InvoiceInput>>,
) -> Result<Json<ApiResponse<Invoice>>, ApiError> {
    let actor = Actor::new(admin.id, payload.pin);
    let created = state
        .shared
        .registry_service
        .create_invoice(&actor, payload.input)
        .await?;
    Ok(Json(ApiResponse::success(created)))
}

/// POST /invoices/{public_id}/update
pub async fn update_invoice(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Path(public_id): Path<String>,
    Json(payload): Json<Guarded<InvoiceInput>>,
) -> Result<Json<ApiResponse<Invoice>>, ApiError> {
    let actor = Actor::new(admin.id, payload.pin);
    let updated = state
        .shared
        .registry_service
        .update_invoice(&actor, &public_id, payload.input)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// POST /invoices/{public_id}/delete
pub async fn delete_invoice(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
    Path(public_id): Path<String>,
    payload: Option<Json<PinRequest>>,
) -> Result<Json<ApiResponse<DeleteResponse<Invoice>>>, ApiError> {
    let Json(PinRequest { pin }) = payload.unwrap_or_default();
    let actor = Actor::new(admin.id, pin);
    let remaining = state
        .shared
        .registry_service
        .delete_invoice(&actor, &public_id)
        .await?;
    Ok(Json(ApiResponse::success(DeleteResponse::ok(remaining))))
}
