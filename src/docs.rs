use crate::api::requests::{EditBody, HistoryQuery, RejectBody};
use crate::model::notification::{Notification, NotificationKind};
use crate::model::planning::{NewPlanningEntry, PlanningEntry};
use crate::model::request::{EmployeeSummary, NewRequest, Request, RequestStatus, RequestType};
use crate::model::role::Role;
use crate::service::WeekStatus;
use crate::workflow::planning::ReminderPolicy;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CIH Portal API",
        version = "1.0.0",
        description = r#"
## Council internal portal

Backend of the internal portal used by council staff.

### Key Features
- **Requests**
  - Vacation, permit, materials, vehicle and other requests
  - Two-stage approval: unit chief, then management
  - Rejection with a mandatory reason at either stage
- **Weekly planning**
  - One entry per employee and weekday
  - Mid-week reminders and an end-of-week close that fills the gaps
- **Notifications**
  - Inbox per user, fed by every workflow transition

### Security
Endpoints under `/api` require a **JWT Bearer** token issued by the account backend.
The role claim accepts legacy slugs (`jefe`, `gerencia`, ...).

### Response Format
Every response is `{ "success": bool, "data"?: ..., "message"?: string }`.
"#,
    ),
    paths(
        crate::api::requests::create_request,
        crate::api::requests::my_requests,
        crate::api::requests::unit_requests,
        crate::api::requests::pending_chief,
        crate::api::requests::pending_manager,
        crate::api::requests::manager_history,
        crate::api::requests::update_request,
        crate::api::requests::approve_chief,
        crate::api::requests::approve_manager,
        crate::api::requests::reject_request,

        crate::api::planning::list_planning,
        crate::api::planning::unit_planning,
        crate::api::planning::employee_planning,
        crate::api::planning::week_status,
        crate::api::planning::create_planning,
        crate::api::planning::update_planning,
        crate::api::planning::delete_planning,

        crate::api::notifications::list_notifications,
        crate::api::notifications::mark_read,
        crate::api::notifications::mark_all_read,
        crate::api::notifications::delete_all,

        crate::api::cron::close_planning
    ),
    components(
        schemas(
            Role,
            RequestType,
            RequestStatus,
            EmployeeSummary,
            Request,
            NewRequest,
            RejectBody,
            EditBody,
            HistoryQuery,
            PlanningEntry,
            NewPlanningEntry,
            ReminderPolicy,
            WeekStatus,
            NotificationKind,
            Notification
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Requests", description = "Request submission and approval"),
        (name = "Planning", description = "Weekly field planning"),
        (name = "Notifications", description = "User inbox"),
        (name = "Cron", description = "Scheduled jobs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
