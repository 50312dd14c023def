use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;
use tracing::{info, warn};

use crate::api::{AppState, ok};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::workflow::planning::local_today;

pub const CRON_TOKEN_HEADER: &str = "X-Cron-Token";

/// End-of-week job: fill unplanned weekdays with placeholders and tell the
/// chiefs. Meant to be triggered by an external scheduler.
#[utoipa::path(
    post,
    path = "/cron/close-planning",
    params(
        ("X-Cron-Token" = Option<String>, Header, description = "Shared secret from CRON_TOKEN")
    ),
    responses(
        (status = 200, description = "Week closed", body = Object, example = json!({
            "success": true,
            "data": {"employees_filled": 3}
        })),
        (status = 401, description = "Missing or wrong cron token, or no token configured"),
        (status = 429, description = "Too many requests")
    ),
    tag = "Cron"
)]
pub async fn close_planning(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let Some(expected) = &config.cron_token else {
        warn!("Cron call refused: CRON_TOKEN is not configured");
        return Err(AppError::Unauthorized("Cron endpoint is disabled".into()));
    };
    let presented = req
        .headers()
        .get(CRON_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok());
    if presented != Some(expected.as_str()) {
        warn!("Cron call with missing or wrong token");
        return Err(AppError::Unauthorized("Invalid cron token".into()));
    }

    let today = local_today(config.utc_offset());
    let filled = state.planning.close_week(today).await?;
    info!(%today, employees_filled = filled, "Planning week closed");

    Ok(ok(json!({ "employees_filled": filled })))
}
