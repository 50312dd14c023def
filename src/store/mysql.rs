use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool, mysql::MySqlArguments, query::QueryAs};

use super::{
    EmployeeStore, NotificationStore, PlanningStore, RequestStore, StoreError, StoreResult,
};
use crate::model::employee::Employee;
use crate::model::notification::{Audience, Notice, Notification, NotificationKind};
use crate::model::planning::{NewPlanningEntry, PlanningEntry, PlanningScope};
use crate::model::request::{EmployeeSummary, NewRequest, Request, RequestStatus};
use crate::model::role::Role;

const REQUEST_SELECT: &str = r#"
    SELECT r.id, r.employee_id, r.request_type, r.description, r.start_date, r.end_date,
           r.status, r.rejection_reason, r.created_at, r.updated_at,
           e.full_name, e.department_id
    FROM requests r
    LEFT JOIN employees e ON e.id = r.employee_id
"#;

const PLANNING_SELECT: &str = r#"
    SELECT p.id, p.employee_id, p.date, p.location, p.sector, p.area, p.resources,
           p.service_line, p.duration, p.description, p.created_at, p.updated_at,
           e.full_name, e.department_id
    FROM planning_entries p
    LEFT JOIN employees e ON e.id = p.employee_id
"#;

const EMPLOYEE_SELECT: &str = r#"
    SELECT e.id, e.user_id, e.full_name, e.department_id, e.employment_status,
           e.vacation_days_balance, u.role
    FROM employees e
    LEFT JOIN users u ON u.id = e.user_id
"#;

const NOTIFICATION_SELECT: &str = r#"
    SELECT id, user_id, kind, title, message, request_id, missing_dates, link, read_at, created_at
    FROM notifications
"#;

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
    Time(DateTime<Utc>),
}

fn bind_all<'q, O>(
    mut query: QueryAs<'q, sqlx::MySql, O, MySqlArguments>,
    args: &'q [FilterValue<'q>],
) -> QueryAs<'q, sqlx::MySql, O, MySqlArguments> {
    for arg in args {
        query = match arg {
            FilterValue::U64(v) => query.bind(*v),
            FilterValue::Str(s) => query.bind(*s),
            FilterValue::Time(t) => query.bind(*t),
        };
    }
    query
}

fn parse<T: std::str::FromStr>(value: &str, what: &str) -> StoreResult<T> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown {what} '{value}'")))
}

#[derive(FromRow)]
struct RequestRow {
    id: u64,
    employee_id: u64,
    request_type: String,
    description: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    status: String,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    full_name: Option<String>,
    department_id: Option<u64>,
}

impl TryFrom<RequestRow> for Request {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> StoreResult<Self> {
        let employee = row.full_name.map(|full_name| EmployeeSummary {
            full_name,
            department_id: row.department_id,
        });
        Ok(Request {
            id: row.id,
            employee_id: row.employee_id,
            request_type: parse(&row.request_type, "request type")?,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            status: parse(&row.status, "request status")?,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
            employee,
        })
    }
}

#[derive(FromRow)]
struct PlanningRow {
    id: u64,
    employee_id: u64,
    date: NaiveDate,
    location: String,
    sector: String,
    area: String,
    resources: String,
    service_line: String,
    duration: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    full_name: Option<String>,
    department_id: Option<u64>,
}

impl From<PlanningRow> for PlanningEntry {
    fn from(row: PlanningRow) -> Self {
        PlanningEntry {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            location: row.location,
            sector: row.sector,
            area: row.area,
            resources: row.resources,
            service_line: row.service_line,
            duration: row.duration,
            description: row.description,
            employee_name: row.full_name,
            department_id: row.department_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    id: u64,
    user_id: Option<u64>,
    full_name: String,
    department_id: Option<u64>,
    employment_status: String,
    vacation_days_balance: i64,
    role: Option<String>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = StoreError;

    fn try_from(row: EmployeeRow) -> StoreResult<Self> {
        let role = match row.role.as_deref() {
            Some(slug) => Role::from_slug(slug)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown role '{slug}'")))?,
            None => Role::Employee,
        };
        Ok(Employee {
            id: row.id,
            user_id: row.user_id,
            full_name: row.full_name,
            department_id: row.department_id,
            role,
            vacation_days_balance: row.vacation_days_balance,
            active: row.employment_status.eq_ignore_ascii_case("active"),
        })
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: u64,
    user_id: u64,
    kind: String,
    title: String,
    message: String,
    request_id: Option<u64>,
    missing_dates: Option<String>,
    link: Option<String>,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> StoreResult<Self> {
        let missing_dates = match row.missing_dates.as_deref() {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw)
                .map_err(|e| StoreError::Corrupt(format!("missing_dates: {e}")))?,
            _ => Vec::new(),
        };
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind: parse(&row.kind, "notification kind")?,
            title: row.title,
            message: row.message,
            request_id: row.request_id,
            missing_dates,
            link: row.link,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// MySQL-backed store.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_requests(
        &self,
        where_sql: &str,
        order_sql: &str,
        args: &[FilterValue<'_>],
    ) -> StoreResult<Vec<Request>> {
        let sql = format!("{REQUEST_SELECT} {where_sql} {order_sql}");
        let rows = bind_all(sqlx::query_as::<_, RequestRow>(&sql), args)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Request::try_from).collect()
    }

    async fn fetch_entries(
        &self,
        where_sql: &str,
        order_sql: &str,
        args: &[FilterValue<'_>],
    ) -> StoreResult<Vec<PlanningEntry>> {
        let sql = format!("{PLANNING_SELECT} {where_sql} {order_sql}");
        let rows = bind_all(sqlx::query_as::<_, PlanningRow>(&sql), args)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(PlanningEntry::from).collect())
    }

    async fn users_with_role(&self, role: Role, department_id: Option<u64>) -> StoreResult<Vec<u64>> {
        let slugs = role.slugs();
        let placeholders = vec!["?"; slugs.len()].join(", ");
        let mut sql = format!("SELECT id FROM users WHERE role IN ({placeholders})");
        if department_id.is_some() {
            sql.push_str(" AND department_id = ?");
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query_scalar::<_, u64>(&sql);
        for slug in slugs {
            query = query.bind(*slug);
        }
        if let Some(department) = department_id {
            query = query.bind(department);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl RequestStore for MySqlStore {
    async fn insert_request(
        &self,
        employee_id: u64,
        new: &NewRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<Request> {
        let result = sqlx::query(
            r#"
            INSERT INTO requests
                (employee_id, request_type, description, start_date, end_date, status,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(new.request_type.as_ref())
        .bind(new.description.trim())
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(RequestStatus::PendingApproval.as_ref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id();
        self.find_request(id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("request {id} vanished after insert")))
    }

    async fn find_request(&self, id: u64) -> StoreResult<Option<Request>> {
        let sql = format!("{REQUEST_SELECT} WHERE r.id = ?");
        sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Request::try_from)
            .transpose()
    }

    async fn update_status(
        &self,
        id: u64,
        from: RequestStatus,
        to: RequestStatus,
        rejection_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE requests
            SET status = ?, rejection_reason = ?, updated_at = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(to.as_ref())
        .bind(rejection_reason)
        .bind(now)
        .bind(id)
        .bind(from.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_description(
        &self,
        id: u64,
        employee_id: u64,
        description: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE requests
            SET description = ?, updated_at = ?
            WHERE id = ?
            AND employee_id = ?
            AND status = ?
            "#,
        )
        .bind(description)
        .bind(now)
        .bind(id)
        .bind(employee_id)
        .bind(RequestStatus::PendingApproval.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn requests_by_employee(&self, employee_id: u64) -> StoreResult<Vec<Request>> {
        self.fetch_requests(
            "WHERE r.employee_id = ?",
            "ORDER BY r.created_at DESC, r.id DESC",
            &[FilterValue::U64(employee_id)],
        )
        .await
    }

    async fn requests_by_unit(&self, department_id: u64) -> StoreResult<Vec<Request>> {
        self.fetch_requests(
            "WHERE e.department_id = ?",
            "ORDER BY r.created_at DESC, r.id DESC",
            &[FilterValue::U64(department_id)],
        )
        .await
    }

    async fn requests_with_status(
        &self,
        status: RequestStatus,
        department_id: Option<u64>,
    ) -> StoreResult<Vec<Request>> {
        let mut where_sql = String::from("WHERE r.status = ?");
        let mut args = vec![FilterValue::Str(status.as_ref())];
        if let Some(department) = department_id {
            where_sql.push_str(" AND e.department_id = ?");
            args.push(FilterValue::U64(department));
        }
        self.fetch_requests(&where_sql, "ORDER BY r.created_at ASC, r.id ASC", &args)
            .await
    }

    async fn approved_between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> StoreResult<Vec<Request>> {
        let approved = RequestStatus::Approved;
        let mut where_sql = String::from("WHERE r.status = ?");
        let mut args = vec![FilterValue::Str(approved.as_ref())];

        if let Some(start) = start {
            where_sql.push_str(" AND r.updated_at >= ?");
            args.push(FilterValue::Time(start_of(start)));
        }
        if let Some(end) = end {
            where_sql.push_str(" AND r.updated_at < ?");
            args.push(FilterValue::Time(start_of(end + Duration::days(1))));
        }

        self.fetch_requests(&where_sql, "ORDER BY r.updated_at DESC, r.id DESC", &args)
            .await
    }
}

#[async_trait]
impl EmployeeStore for MySqlStore {
    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        let sql = format!("{EMPLOYEE_SELECT} WHERE e.id = ?");
        sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Employee::try_from)
            .transpose()
    }

    async fn active_planners(&self) -> StoreResult<Vec<Employee>> {
        let sql = format!("{EMPLOYEE_SELECT} WHERE e.employment_status = 'active' ORDER BY e.id");
        let rows = sqlx::query_as::<_, EmployeeRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let mut planners = Vec::with_capacity(rows.len());
        for row in rows {
            let employee = Employee::try_from(row)?;
            if employee.role.plans_weekly() {
                planners.push(employee);
            }
        }
        Ok(planners)
    }

    async fn deduct_vacation_days(&self, employee_id: u64, days: i64) -> StoreResult<()> {
        sqlx::query(
            "UPDATE employees SET vacation_days_balance = vacation_days_balance - ? WHERE id = ?",
        )
        .bind(days)
        .bind(employee_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PlanningStore for MySqlStore {
    async fn insert_entry(
        &self,
        entry: &NewPlanningEntry,
        now: DateTime<Utc>,
    ) -> StoreResult<PlanningEntry> {
        let result = sqlx::query(
            r#"
            INSERT INTO planning_entries
                (employee_id, date, location, sector, area, resources, service_line,
                 duration, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.employee_id)
        .bind(entry.date)
        .bind(&entry.location)
        .bind(&entry.sector)
        .bind(&entry.area)
        .bind(&entry.resources)
        .bind(&entry.service_line)
        .bind(&entry.duration)
        .bind(&entry.description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id();
        self.fetch_entries("WHERE p.id = ?", "", &[FilterValue::U64(id)])
            .await?
            .pop()
            .ok_or_else(|| StoreError::Corrupt(format!("planning entry {id} vanished after insert")))
    }

    async fn update_entry(
        &self,
        id: u64,
        entry: &NewPlanningEntry,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PlanningEntry>> {
        // MySQL reports zero affected rows for an identical rewrite, so look
        // the row up instead of trusting rows_affected.
        sqlx::query(
            r#"
            UPDATE planning_entries
            SET employee_id = ?, date = ?, location = ?, sector = ?, area = ?, resources = ?,
                service_line = ?, duration = ?, description = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(entry.employee_id)
        .bind(entry.date)
        .bind(&entry.location)
        .bind(&entry.sector)
        .bind(&entry.area)
        .bind(&entry.resources)
        .bind(&entry.service_line)
        .bind(&entry.duration)
        .bind(&entry.description)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.find_entry(id).await
    }

    async fn find_entry(&self, id: u64) -> StoreResult<Option<PlanningEntry>> {
        Ok(self
            .fetch_entries("WHERE p.id = ?", "", &[FilterValue::U64(id)])
            .await?
            .pop())
    }

    async fn delete_entry(&self, id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM planning_entries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn entry_exists(
        &self,
        employee_id: u64,
        date: NaiveDate,
        excluding: Option<u64>,
    ) -> StoreResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM planning_entries
            WHERE employee_id = ? AND date = ? AND (? IS NULL OR id <> ?)
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .bind(excluding)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn entries(&self, scope: PlanningScope) -> StoreResult<Vec<PlanningEntry>> {
        let order = "ORDER BY p.date DESC, p.id DESC";
        match scope {
            PlanningScope::All => self.fetch_entries("", order, &[]).await,
            PlanningScope::Employee(id) => {
                self.fetch_entries("WHERE p.employee_id = ?", order, &[FilterValue::U64(id)])
                    .await
            }
            PlanningScope::Unit(department) => {
                self.fetch_entries(
                    "WHERE e.department_id = ?",
                    order,
                    &[FilterValue::U64(department)],
                )
                .await
            }
        }
    }

    async fn entries_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<PlanningEntry>> {
        let sql = format!(
            "{PLANNING_SELECT} WHERE p.employee_id = ? AND p.date BETWEEN ? AND ? ORDER BY p.date, p.id"
        );
        let rows = sqlx::query_as::<_, PlanningRow>(&sql)
            .bind(employee_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(PlanningEntry::from).collect())
    }
}

#[async_trait]
impl NotificationStore for MySqlStore {
    async fn recipients(&self, audience: Audience) -> StoreResult<Vec<u64>> {
        match audience {
            Audience::Employee(id) => Ok(sqlx::query_scalar::<_, u64>(
                "SELECT user_id FROM employees WHERE id = ? AND user_id IS NOT NULL",
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await?),
            Audience::User(id) => Ok(vec![id]),
            Audience::Chiefs { department_id } => {
                self.users_with_role(Role::Chief, Some(department_id)).await
            }
            Audience::Managers => self.users_with_role(Role::Manager, None).await,
            Audience::Admins => self.users_with_role(Role::Admin, None).await,
        }
    }

    async fn insert_notification(
        &self,
        user_id: u64,
        notice: &Notice,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let missing_dates = if notice.missing_dates.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&notice.missing_dates)
                    .map_err(|e| StoreError::Corrupt(format!("missing_dates: {e}")))?,
            )
        };

        sqlx::query(
            r#"
            INSERT INTO notifications
                (user_id, kind, title, message, request_id, missing_dates, link, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(notice.kind.as_ref())
        .bind(&notice.title)
        .bind(&notice.message)
        .bind(notice.request_id)
        .bind(missing_dates)
        .bind(notice.link.as_deref())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_for_request(
        &self,
        kind: NotificationKind,
        request_id: u64,
    ) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE kind = ? AND request_id = ?")
            .bind(kind.as_ref())
            .bind(request_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn has_unread(&self, user_id: u64, kind: NotificationKind) -> StoreResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND kind = ? AND read_at IS NULL",
        )
        .bind(user_id)
        .bind(kind.as_ref())
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn notifications_for(
        &self,
        user_id: u64,
        limit: u32,
    ) -> StoreResult<Vec<Notification>> {
        let sql = format!("{NOTIFICATION_SELECT} WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?");
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn mark_read(&self, user_id: u64, id: u64, now: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = COALESCE(read_at, ?) WHERE id = ? AND user_id = ?",
        )
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: u64, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = ? WHERE user_id = ? AND read_at IS NULL",
        )
        .bind(now)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self, user_id: u64) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
