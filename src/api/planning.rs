use actix_web::{HttpResponse, web};
use tracing::{debug, warn};

use crate::api::{ApiResponse, AppState, ok};
use crate::auth::AuthUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::planning::{NewPlanningEntry, PlanningScope};
use crate::workflow::planning::local_today;

/// Non-supervisors may only touch their own planning.
fn ensure_can_manage(auth: &AuthUser, employee_id: u64) -> AppResult<()> {
    if auth.supervises() || auth.employee_id == Some(employee_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You can only manage your own planning".into(),
        ))
    }
}

#[utoipa::path(
    get,
    path = "/api/planificacion",
    responses(
        (status = 200, description = "Planning entries, newest date first. Supervisors see every employee", body = Object),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Planning"
)]
pub async fn list_planning(
    auth: AuthUser,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let scope = if auth.supervises() {
        PlanningScope::All
    } else {
        PlanningScope::Employee(auth.require_employee()?)
    };
    let entries = state.planning.list(scope).await?;

    let today = local_today(config.utc_offset());
    match state
        .planning
        .remind(auth.user_id, auth.role, auth.employee_id, today)
        .await
    {
        Ok(reminded) => debug!(user_id = auth.user_id, reminded, "Planning reminder check"),
        Err(e) => warn!(error = %e, user_id = auth.user_id, "Planning reminder check failed"),
    }

    Ok(ok(entries))
}

#[utoipa::path(
    get,
    path = "/api/planificacion/my-unit",
    responses(
        (status = 200, description = "Planning of the caller's unit", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No organizational unit assigned")
    ),
    security(("bearer_auth" = [])),
    tag = "Planning"
)]
pub async fn unit_planning(auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let department_id = auth.require_department()?;
    Ok(ok(state
        .planning
        .list(PlanningScope::Unit(department_id))
        .await?))
}

#[utoipa::path(
    get,
    path = "/api/planificacion/empleado/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee whose planning to list")),
    responses(
        (status = 200, description = "Planning of one employee, newest date first", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the employee or a supervisor")
    ),
    security(("bearer_auth" = [])),
    tag = "Planning"
)]
pub async fn employee_planning(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();
    ensure_can_manage(&auth, employee_id)?;
    Ok(ok(state
        .planning
        .list(PlanningScope::Employee(employee_id))
        .await?))
}

#[utoipa::path(
    get,
    path = "/api/planificacion/week",
    responses(
        (status = 200, description = "Completion of the caller's current work week", body = WeekStatus),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller has no employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Planning"
)]
pub async fn week_status(
    auth: AuthUser,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let today = local_today(config.utc_offset());
    Ok(ok(state.planning.week_status(employee_id, today).await?))
}

#[utoipa::path(
    post,
    path = "/api/planificacion",
    request_body(content = NewPlanningEntry, content_type = "application/json"),
    responses(
        (status = 201, description = "Planning entry created", body = Object),
        (status = 400, description = "Missing field or day already planned"),
        (status = 403, description = "Not the employee or a supervisor")
    ),
    security(("bearer_auth" = [])),
    tag = "Planning"
)]
pub async fn create_planning(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<NewPlanningEntry>,
) -> AppResult<HttpResponse> {
    let entry = payload.into_inner();
    ensure_can_manage(&auth, entry.employee_id)?;
    let created = state.planning.create(entry).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(created, "Planning saved")))
}

#[utoipa::path(
    put,
    path = "/api/planificacion/{entry_id}",
    params(("entry_id" = u64, Path, description = "Planning entry to replace")),
    request_body(content = NewPlanningEntry, content_type = "application/json"),
    responses(
        (status = 200, description = "Planning entry updated", body = Object),
        (status = 400, description = "Missing field or day already planned"),
        (status = 403, description = "Not the employee or a supervisor"),
        (status = 404, description = "Planning entry not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Planning"
)]
pub async fn update_planning(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<NewPlanningEntry>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let entry = payload.into_inner();
    let existing = state.planning.find(id).await?;
    ensure_can_manage(&auth, existing.employee_id)?;
    ensure_can_manage(&auth, entry.employee_id)?;

    Ok(ok(state.planning.update(id, entry).await?))
}

#[utoipa::path(
    delete,
    path = "/api/planificacion/{entry_id}",
    params(("entry_id" = u64, Path, description = "Planning entry to delete")),
    responses(
        (status = 200, description = "Planning entry deleted", body = Object),
        (status = 403, description = "Not the employee or a supervisor"),
        (status = 404, description = "Planning entry not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Planning"
)]
pub async fn delete_planning(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let existing = state.planning.find(id).await?;
    ensure_can_manage(&auth, existing.employee_id)?;
    state.planning.delete(id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Planning entry deleted")))
}
