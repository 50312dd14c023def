//! Persistence seam for the portal.
//!
//! Every write that moves a request between states is a compare-and-set on the
//! current status, so of two racing approvals only one reports success.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::employee::Employee;
use crate::model::notification::{Audience, Notice, Notification, NotificationKind};
use crate::model::planning::{NewPlanningEntry, PlanningEntry, PlanningScope};
use crate::model::request::{NewRequest, Request, RequestStatus};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A stored value no longer parses into its domain type.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert_request(
        &self,
        employee_id: u64,
        new: &NewRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<Request>;

    async fn find_request(&self, id: u64) -> StoreResult<Option<Request>>;

    /// Moves `id` from `from` to `to`. Returns `false` if the request was no
    /// longer in `from`.
    async fn update_status(
        &self,
        id: u64,
        from: RequestStatus,
        to: RequestStatus,
        rejection_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Rewrites the description while the request still awaits its first
    /// approval. Returns `false` otherwise.
    async fn update_description(
        &self,
        id: u64,
        employee_id: u64,
        description: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Newest first.
    async fn requests_by_employee(&self, employee_id: u64) -> StoreResult<Vec<Request>>;

    /// Newest first.
    async fn requests_by_unit(&self, department_id: u64) -> StoreResult<Vec<Request>>;

    /// Oldest first, ties by id.
    async fn requests_with_status(
        &self,
        status: RequestStatus,
        department_id: Option<u64>,
    ) -> StoreResult<Vec<Request>>;

    /// Approved requests whose last update falls inside the inclusive range,
    /// most recently updated first.
    async fn approved_between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> StoreResult<Vec<Request>>;
}

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>>;

    /// Active employees expected to fill in weekly planning.
    async fn active_planners(&self) -> StoreResult<Vec<Employee>>;

    async fn deduct_vacation_days(&self, employee_id: u64, days: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait PlanningStore: Send + Sync {
    async fn insert_entry(
        &self,
        entry: &NewPlanningEntry,
        now: DateTime<Utc>,
    ) -> StoreResult<PlanningEntry>;

    async fn update_entry(
        &self,
        id: u64,
        entry: &NewPlanningEntry,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PlanningEntry>>;

    async fn find_entry(&self, id: u64) -> StoreResult<Option<PlanningEntry>>;

    async fn delete_entry(&self, id: u64) -> StoreResult<bool>;

    async fn entry_exists(
        &self,
        employee_id: u64,
        date: NaiveDate,
        excluding: Option<u64>,
    ) -> StoreResult<bool>;

    /// Newest date first.
    async fn entries(&self, scope: PlanningScope) -> StoreResult<Vec<PlanningEntry>>;

    async fn entries_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<PlanningEntry>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// User ids a notice addressed to `audience` should reach.
    async fn recipients(&self, audience: Audience) -> StoreResult<Vec<u64>>;

    async fn insert_notification(
        &self,
        user_id: u64,
        notice: &Notice,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn delete_for_request(&self, kind: NotificationKind, request_id: u64)
    -> StoreResult<u64>;

    async fn has_unread(&self, user_id: u64, kind: NotificationKind) -> StoreResult<bool>;

    /// Newest first, at most `limit`.
    async fn notifications_for(&self, user_id: u64, limit: u32)
    -> StoreResult<Vec<Notification>>;

    async fn mark_read(&self, user_id: u64, id: u64, now: DateTime<Utc>) -> StoreResult<bool>;

    async fn mark_all_read(&self, user_id: u64, now: DateTime<Utc>) -> StoreResult<u64>;

    async fn delete_all(&self, user_id: u64) -> StoreResult<u64>;
}

/// Everything the services need from persistence.
pub trait Store: RequestStore + EmployeeStore + PlanningStore + NotificationStore {}

impl<T> Store for T where T: RequestStore + EmployeeStore + PlanningStore + NotificationStore {}
