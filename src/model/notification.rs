use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, EnumString, Display, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    RequestCreated,
    RequestPendingAuth,
    RequestManagerFinalized,
    RequestUpdate,
    PlanningReminder,
    PlanningIncomplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: u64,
    pub user_id: u64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schema(value_type = Vec<String>)]
    pub missing_dates: Vec<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub read_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

/// Who a notice is addressed to; resolved to user ids by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The user account linked to an employee record.
    Employee(u64),
    /// A single user account.
    User(u64),
    Chiefs { department_id: u64 },
    Managers,
    Admins,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub audience: Audience,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub request_id: Option<u64>,
    pub missing_dates: Vec<NaiveDate>,
    pub link: Option<String>,
}

impl Notice {
    pub fn new(
        audience: Audience,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            audience,
            kind,
            title: title.into(),
            message: message.into(),
            request_id: None,
            missing_dates: Vec::new(),
            link: None,
        }
    }

    pub fn for_request(mut self, request_id: u64) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_missing_dates(mut self, dates: Vec<NaiveDate>) -> Self {
        self.missing_dates = dates;
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}
