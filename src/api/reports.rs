use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_report_range;
use super::{ApiError, ApiResponse, AppState};
use crate::models::Report;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GET /reports
///
/// `start_date` and `end_date` are inclusive `YYYY-MM-DD` bounds and default
/// to the current month.
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ApiResponse<Report>>, ApiError> {
    let range = validate_report_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let report = state.shared.registry_service.report(range).await?;
    Ok(Json(ApiResponse::success(report)))
}
