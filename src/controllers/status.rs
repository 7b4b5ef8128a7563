use actix_web::{web, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::controllers::ApiError;
use crate::state::AppState;

// Run a sweep now and return results keyed by url
pub async fn check_status(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    info!("Request to check all sites");
    let monitor = Arc::clone(&data.monitor);

    // Panics inside the sweep surface as a 500.
    let report = tokio::spawn(async move { monitor.run_sweep().await })
        .await
        .map_err(|e| ApiError::Internal(format!("sweep task failed: {}", e)))?;

    info!("Returning results for {} sites", report.results.len());
    Ok(HttpResponse::Ok().json(report.results))
}

// Latest sweep published in dashboard mode
pub async fn last_status(data: web::Data<AppState>) -> HttpResponse {
    match data.monitor.last_sweep().await {
        Some(report) => HttpResponse::Ok().json(report.results),
        None => HttpResponse::NotFound().json(json!({ "error": "No sweep has completed yet" })),
    }
}
