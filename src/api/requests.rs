use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::api::{ApiResponse, AppState, ok};
use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::model::request::NewRequest;
use crate::model::role::Role;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectBody {
    #[schema(example = "Dates overlap with the annual audit")]
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditBody {
    #[schema(example = "Leather gloves, size M")]
    pub description: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    /// First day of the range, inclusive
    #[schema(example = "2025-06-01", format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>, format = "date")]
    pub start: Option<NaiveDate>,
    /// Last day of the range, inclusive
    #[schema(example = "2025-06-30", format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>, format = "date")]
    pub end: Option<NaiveDate>,
}

/* =========================
Submit request
========================= */
#[utoipa::path(
    post,
    path = "/api/requests",
    request_body(
        content = NewRequest,
        description = "Request payload; vacation and permit need a date range",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Request created in pending_approval", body = Object,
         example = json!({
            "success": true,
            "data": {"id": 42, "type": "vacation", "status": "pending_approval"}
         })
        ),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller has no employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn create_request(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<NewRequest>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let request = state
        .requests
        .submit(employee_id, payload.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(request, "Request submitted")))
}

#[utoipa::path(
    get,
    path = "/api/requests/my",
    responses(
        (status = 200, description = "Caller's requests, newest first", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller has no employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn my_requests(auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee()?;
    Ok(ok(state.requests.list_for_employee(employee_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/requests/unit",
    responses(
        (status = 200, description = "Requests of the caller's unit, newest first", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Chief only")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn unit_requests(auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth.require_role(&[Role::Chief])?;
    let department_id = auth.require_department()?;
    Ok(ok(state.requests.list_for_unit(department_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/requests/pending-chief",
    responses(
        (status = 200, description = "Requests awaiting the chief, oldest first", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Chief only")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn pending_chief(auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    auth.require_role(&[Role::Chief])?;
    let pending = state
        .requests
        .list_pending_for_role(Role::Chief, auth.department_id)
        .await?;
    debug!(user_id = auth.user_id, count = pending.len(), "Listed chief queue");
    Ok(ok(pending))
}

#[utoipa::path(
    get,
    path = "/api/requests/pending-manager",
    responses(
        (status = 200, description = "Requests awaiting the manager, oldest first", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn pending_manager(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    auth.require_role(&[Role::Manager])?;
    Ok(ok(state
        .requests
        .list_pending_for_role(Role::Manager, None)
        .await?))
}

#[utoipa::path(
    get,
    path = "/api/requests/manager/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Approved requests in range", body = Object),
        (status = 400, description = "start is after end"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn manager_history(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> AppResult<HttpResponse> {
    auth.require_role(&[Role::Manager])?;
    Ok(ok(state
        .requests
        .approved_history(query.start, query.end)
        .await?))
}

#[utoipa::path(
    put,
    path = "/api/requests/{request_id}",
    params(("request_id" = u64, Path, description = "Request to edit")),
    request_body(content = EditBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Description updated", body = Object),
        (status = 403, description = "Not the requester"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn update_request(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<EditBody>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let request = state
        .requests
        .update_description(path.into_inner(), employee_id, &payload.description)
        .await?;
    Ok(ok(request))
}

/* =========================
Approve (chief stage)
========================= */
#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/approve-chief",
    params(("request_id" = u64, Path, description = "Request to approve")),
    responses(
        (status = 200, description = "Moved to pending_authorization", body = Object,
         example = json!({
            "success": true,
            "message": "Request approved",
            "data": {"id": 42, "status": "pending_authorization"}
         })
        ),
        (status = 403, description = "Wrong role for the request's current stage"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn approve_chief(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let request = state
        .requests
        .approve_as(path.into_inner(), auth.role, Role::Chief)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(request, "Request approved")))
}

/* =========================
Approve (manager stage)
========================= */
#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/approve-manager",
    params(("request_id" = u64, Path, description = "Request to authorize")),
    responses(
        (status = 200, description = "Request approved", body = Object),
        (status = 403, description = "Wrong role for the request's current stage"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn approve_manager(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let request = state
        .requests
        .approve_as(path.into_inner(), auth.role, Role::Manager)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(request, "Request authorized")))
}

/* =========================
Reject (chief or manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/reject",
    params(("request_id" = u64, Path, description = "Request to reject")),
    request_body(content = RejectBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Request rejected", body = Object),
        (status = 400, description = "Missing reason"),
        (status = 403, description = "Wrong role for the request's current stage"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn reject_request(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<RejectBody>,
) -> AppResult<HttpResponse> {
    let request = state
        .requests
        .reject(path.into_inner(), auth.role, &payload.reason)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(request, "Request rejected")))
}
