use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{validate_limit, validate_public_id};
use super::{ApiError, ApiResponse, AppState};
use crate::db::DashboardCounts;
use crate::entities::{activity_logs, pin_audit_logs};

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<u64>,
    /// Public ID of an admin to filter by.
    pub admin: Option<String>,
}

impl AuditQuery {
    async fn resolve(&self, state: &AppState) -> Result<(Option<i32>, u64), ApiError> {
        let limit = validate_limit(self.limit)?;

        let admin_id = match self.admin.as_deref().filter(|a| !a.is_empty()) {
            None => None,
            Some(public_id) => {
                let public_id = validate_public_id(public_id)?;
                let admin = state
                    .store()
                    .admin_repo()
                    .find_by_public_id(public_id)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Admin", public_id))?;
                Some(admin.id)
            }
        };

        Ok((admin_id, limit))
    }
}

/// GET /audit/activity
pub async fn list_activity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ApiResponse<Vec<activity_logs::Model>>>, ApiError> {
    let (admin_id, limit) = query.resolve(&state).await?;
    let rows = state.shared.audit.recent_activity(admin_id, limit).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// GET /audit/pin
pub async fn list_pin_audit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ApiResponse<Vec<pin_audit_logs::Model>>>, ApiError> {
    let (admin_id, limit) = query.resolve(&state).await?;
    let rows = state.shared.audit.recent_pin_audit(admin_id, limit).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// GET /dashboard/stats
pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DashboardCounts>>, ApiError> {
    let counts = state.shared.registry_service.dashboard_counts().await?;
    Ok(Json(ApiResponse::success(counts)))
}
