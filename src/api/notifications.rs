use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::api::{ApiResponse, AppState, ok};
use crate::auth::AuthUser;
use crate::error::AppResult;

#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Caller's notifications, newest first", body = Object),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    Ok(ok(state.notifications.list(auth.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{notification_id}/read",
    params(("notification_id" = u64, Path, description = "Notification to mark as read")),
    responses(
        (status = 200, description = "Marked as read", body = Object),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_read(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    state
        .notifications
        .mark_read(auth.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Notification marked as read")))
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    responses((status = 200, description = "Unread count cleared", body = Object)),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_all_read(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let updated = state.notifications.mark_all_read(auth.user_id).await?;
    Ok(ok(json!({ "updated": updated })))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/delete-all",
    responses((status = 200, description = "Inbox emptied", body = Object)),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn delete_all(auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let deleted = state.notifications.delete_all(auth.user_id).await?;
    Ok(ok(json!({ "deleted": deleted })))
}
