use actix_web::{web, HttpResponse};
use tracing::info;

use crate::controllers::{ApiError, ApiQuery};
use crate::state::AppState;

// Raw history records for one url
pub async fn get_uptime(
    data: web::Data<AppState>,
    query: web::Query<ApiQuery>,
) -> Result<HttpResponse, ApiError> {
    let url = query.required_url()?;
    let hours = query.window_hours();
    info!("Request for {}h of history of {}", hours, url);

    let records = data.monitor.history(url, hours).await;
    Ok(HttpResponse::Ok().json(records))
}

// Uptime statistics for one url
pub async fn get_stats(
    data: web::Data<AppState>,
    query: web::Query<ApiQuery>,
) -> Result<HttpResponse, ApiError> {
    let url = query.required_url()?;
    let hours = query.window_hours();
    info!("Request for {}h uptime stats of {}", hours, url);

    let stats = data.monitor.stats(url, hours).await;
    Ok(HttpResponse::Ok().json(stats))
}
