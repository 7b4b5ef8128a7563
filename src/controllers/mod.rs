//! Read API consumed by the dashboard and the cron trigger

pub mod cron;
pub mod health;
pub mod status;
pub mod uptime;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tracing::error;

use crate::state::AppState;

/// Window used when `hours` is absent or unparsable
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Query string shared by every action
#[derive(Debug, Default, Deserialize)]
pub struct ApiQuery {
    pub action: Option<String>,
    pub url: Option<String>,
    pub hours: Option<String>,
}

impl ApiQuery {
    pub fn required_url(&self) -> Result<&str, ApiError> {
        match self.url.as_deref() {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(ApiError::BadRequest("URL parameter is required".to_string())),
        }
    }

    pub fn window_hours(&self) -> i64 {
        self.hours
            .as_deref()
            .and_then(|h| h.trim().parse().ok())
            .unwrap_or(DEFAULT_WINDOW_HOURS)
    }
}

/// Errors surfaced to API clients as `{"error": message}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Internal failure; the detail is logged, never sent to the client
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "{}", msg),
            ApiError::Internal(_) => write!(f, "Internal server error"),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(detail) = self {
            error!("Internal API error: {}", detail);
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// `GET /?action=...`, routing to the same handlers as the direct paths
pub async fn dispatch(
    data: web::Data<AppState>,
    query: web::Query<ApiQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let action = query.action.clone();

    match action.as_deref() {
        Some("check-status") => status::check_status(data).await,
        Some("last-status") => Ok(status::last_status(data).await),
        Some("get-uptime") => uptime::get_uptime(data, web::Query(query)).await,
        Some("get-stats") => uptime::get_stats(data, web::Query(query)).await,
        Some("get-cron") => Ok(cron::get_cron(data).await),
        _ => Err(ApiError::BadRequest("Invalid action".to_string())),
    }
}

/// Mount every route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(dispatch))
        .route("/health", web::get().to(health::health_check))
        .route("/check-status", web::get().to(status::check_status))
        .route("/last-status", web::get().to(status::last_status))
        .route("/get-uptime", web::get().to(uptime::get_uptime))
        .route("/get-stats", web::get().to(uptime::get_stats))
        .route("/get-cron", web::get().to(cron::get_cron));
}
