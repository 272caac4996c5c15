use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::DashboardError;
use crate::services::DashboardService;

#[axum::debug_handler]
pub async fn get_dashboard_stats(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let dashboard_service = DashboardService::new(&state);

    let stats = dashboard_service.get_stats().await.map_err(|e| match e {
        DashboardError::DatabaseError(msg) => AppError::Database(msg),
    })?;

    Ok(Json(json!(stats)))
}
