use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{error, info};

use crate::state::AppState;

// Cron trigger: sweep, then compact history once a day
pub async fn get_cron(data: web::Data<AppState>) -> HttpResponse {
    info!("Cron check triggered");

    match data.monitor.run_cron().await {
        Ok(summary) => {
            info!("Cron check completed with {} sites down", summary.down_sites.len());
            HttpResponse::Ok().json(summary)
        }
        Err(e) => {
            error!("Cron check failed: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Cron check failed",
                "message": e.to_string(),
                "timestamp": data.monitor.clock().now_string(),
            }))
        }
    }
}
