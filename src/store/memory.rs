use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;

use super::{
    EmployeeStore, NotificationStore, PlanningStore, RequestStore, StoreResult,
};
use crate::model::employee::Employee;
use crate::model::notification::{Audience, Notice, Notification, NotificationKind};
use crate::model::planning::{NewPlanningEntry, PlanningEntry, PlanningScope};
use crate::model::request::{EmployeeSummary, NewRequest, Request, RequestStatus};
use crate::model::role::Role;

/// In-process store for development and tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    employees: HashMap<u64, Employee>,
    requests: Vec<Request>,
    planning: Vec<PlanningEntry>,
    notifications: Vec<Notification>,
    next_request_id: u64,
    next_entry_id: u64,
    next_notification_id: u64,
}

impl Inner {
    fn summary(&self, employee_id: u64) -> Option<EmployeeSummary> {
        self.employees.get(&employee_id).map(|e| EmployeeSummary {
            full_name: e.full_name.clone(),
            department_id: e.department_id,
        })
    }

    fn department_of(&self, employee_id: u64) -> Option<u64> {
        self.employees.get(&employee_id).and_then(|e| e.department_id)
    }

    fn with_summary(&self, request: &Request) -> Request {
        Request {
            employee: self.summary(request.employee_id),
            ..request.clone()
        }
    }

    fn decorate_entry(&self, entry: &PlanningEntry) -> PlanningEntry {
        let employee = self.employees.get(&entry.employee_id);
        PlanningEntry {
            employee_name: employee.map(|e| e.full_name.clone()),
            department_id: employee.and_then(|e| e.department_id),
            ..entry.clone()
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_employee(&self, employee: Employee) {
        self.inner.lock().employees.insert(employee.id, employee);
    }

    pub fn employee(&self, id: u64) -> Option<Employee> {
        self.inner.lock().employees.get(&id).cloned()
    }

    /// Every stored notification, oldest first.
    pub fn all_notifications(&self) -> Vec<Notification> {
        self.inner.lock().notifications.clone()
    }
}

fn newest_first(requests: &mut [Request]) {
    requests.sort_by_key(|r| Reverse((r.created_at, r.id)));
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn insert_request(
        &self,
        employee_id: u64,
        new: &NewRequest,
        now: DateTime<Utc>,
    ) -> StoreResult<Request> {
        let mut inner = self.inner.lock();
        inner.next_request_id += 1;
        let request = Request {
            id: inner.next_request_id,
            employee_id,
            request_type: new.request_type,
            description: new.description.trim().to_string(),
            start_date: new.start_date,
            end_date: new.end_date,
            status: RequestStatus::PendingApproval,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            employee: None,
        };
        inner.requests.push(request.clone());
        Ok(inner.with_summary(&request))
    }

    async fn find_request(&self, id: u64) -> StoreResult<Option<Request>> {
        let inner = self.inner.lock();
        Ok(inner
            .requests
            .iter()
            .find(|r| r.id == id)
            .map(|r| inner.with_summary(r)))
    }

    async fn update_status(
        &self,
        id: u64,
        from: RequestStatus,
        to: RequestStatus,
        rejection_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        match inner.requests.iter_mut().find(|r| r.id == id && r.status == from) {
            Some(request) => {
                request.status = to;
                request.rejection_reason = rejection_reason.map(str::to_string);
                request.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_description(
        &self,
        id: u64,
        employee_id: u64,
        description: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        match inner.requests.iter_mut().find(|r| {
            r.id == id && r.employee_id == employee_id && r.status == RequestStatus::PendingApproval
        }) {
            Some(request) => {
                request.description = description.to_string();
                request.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn requests_by_employee(&self, employee_id: u64) -> StoreResult<Vec<Request>> {
        let inner = self.inner.lock();
        let mut found: Vec<_> = inner
            .requests
            .iter()
            .filter(|r| r.employee_id == employee_id)
            .map(|r| inner.with_summary(r))
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn requests_by_unit(&self, department_id: u64) -> StoreResult<Vec<Request>> {
        let inner = self.inner.lock();
        let mut found: Vec<_> = inner
            .requests
            .iter()
            .filter(|r| inner.department_of(r.employee_id) == Some(department_id))
            .map(|r| inner.with_summary(r))
            .collect();
        newest_first(&mut found);
        Ok(found)
    }

    async fn requests_with_status(
        &self,
        status: RequestStatus,
        department_id: Option<u64>,
    ) -> StoreResult<Vec<Request>> {
        let inner = self.inner.lock();
        let mut found: Vec<_> = inner
            .requests
            .iter()
            .filter(|r| r.status == status)
            .filter(|r| department_id.is_none() || inner.department_of(r.employee_id) == department_id)
            .map(|r| inner.with_summary(r))
            .collect();
        found.sort_by_key(|r| (r.created_at, r.id));
        Ok(found)
    }

    async fn approved_between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> StoreResult<Vec<Request>> {
        let inner = self.inner.lock();
        let mut found: Vec<_> = inner
            .requests
            .iter()
            .filter(|r| r.status == RequestStatus::Approved)
            .filter(|r| {
                let day = r.updated_at.date_naive();
                start.is_none_or(|s| day >= s) && end.is_none_or(|e| day <= e)
            })
            .map(|r| inner.with_summary(r))
            .collect();
        found.sort_by_key(|r| Reverse((r.updated_at, r.id)));
        Ok(found)
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        Ok(self.employee(id))
    }

    async fn active_planners(&self) -> StoreResult<Vec<Employee>> {
        let inner = self.inner.lock();
        let mut found: Vec<_> = inner
            .employees
            .values()
            .filter(|e| e.active && e.role.plans_weekly())
            .cloned()
            .collect();
        found.sort_by_key(|e| e.id);
        Ok(found)
    }

    async fn deduct_vacation_days(&self, employee_id: u64, days: i64) -> StoreResult<()> {
        if let Some(employee) = self.inner.lock().employees.get_mut(&employee_id) {
            employee.vacation_days_balance -= days;
        }
        Ok(())
    }
}

#[async_trait]
impl PlanningStore for MemoryStore {
    async fn insert_entry(
        &self,
        entry: &NewPlanningEntry,
        now: DateTime<Utc>,
    ) -> StoreResult<PlanningEntry> {
        let mut inner = self.inner.lock();
        inner.next_entry_id += 1;
        let stored = PlanningEntry {
            id: inner.next_entry_id,
            employee_id: entry.employee_id,
            date: entry.date,
            location: entry.location.clone(),
            sector: entry.sector.clone(),
            area: entry.area.clone(),
            resources: entry.resources.clone(),
            service_line: entry.service_line.clone(),
            duration: entry.duration.clone(),
            description: entry.description.clone(),
            employee_name: None,
            department_id: None,
            created_at: now,
            updated_at: now,
        };
        inner.planning.push(stored.clone());
        Ok(inner.decorate_entry(&stored))
    }

    async fn update_entry(
        &self,
        id: u64,
        entry: &NewPlanningEntry,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PlanningEntry>> {
        let mut inner = self.inner.lock();
        let Some(stored) = inner.planning.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        stored.employee_id = entry.employee_id;
        stored.date = entry.date;
        stored.location = entry.location.clone();
        stored.sector = entry.sector.clone();
        stored.area = entry.area.clone();
        stored.resources = entry.resources.clone();
        stored.service_line = entry.service_line.clone();
        stored.duration = entry.duration.clone();
        stored.description = entry.description.clone();
        stored.updated_at = now;
        let updated = stored.clone();
        Ok(Some(inner.decorate_entry(&updated)))
    }

    async fn find_entry(&self, id: u64) -> StoreResult<Option<PlanningEntry>> {
        let inner = self.inner.lock();
        Ok(inner
            .planning
            .iter()
            .find(|p| p.id == id)
            .map(|p| inner.decorate_entry(p)))
    }

    async fn delete_entry(&self, id: u64) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        let before = inner.planning.len();
        inner.planning.retain(|p| p.id != id);
        Ok(inner.planning.len() != before)
    }

    async fn entry_exists(
        &self,
        employee_id: u64,
        date: NaiveDate,
        excluding: Option<u64>,
    ) -> StoreResult<bool> {
        let inner = self.inner.lock();
        Ok(inner.planning.iter().any(|p| {
            p.employee_id == employee_id && p.date == date && Some(p.id) != excluding
        }))
    }

    async fn entries(&self, scope: PlanningScope) -> StoreResult<Vec<PlanningEntry>> {
        let inner = self.inner.lock();
        let mut found: Vec<_> = inner
            .planning
            .iter()
            .filter(|p| match scope {
                PlanningScope::All => true,
                PlanningScope::Employee(id) => p.employee_id == id,
                PlanningScope::Unit(department) => {
                    inner.department_of(p.employee_id) == Some(department)
                }
            })
            .map(|p| inner.decorate_entry(p))
            .collect();
        found.sort_by_key(|p| Reverse((p.date, p.id)));
        Ok(found)
    }

    async fn entries_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<PlanningEntry>> {
        let inner = self.inner.lock();
        let mut found: Vec<_> = inner
            .planning
            .iter()
            .filter(|p| p.employee_id == employee_id && p.date >= from && p.date <= to)
            .map(|p| inner.decorate_entry(p))
            .collect();
        found.sort_by_key(|p| (p.date, p.id));
        Ok(found)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn recipients(&self, audience: Audience) -> StoreResult<Vec<u64>> {
        let inner = self.inner.lock();
        let with_role = |role: Role, department: Option<u64>| -> Vec<u64> {
            let mut ids: Vec<u64> = inner
                .employees
                .values()
                .filter(|e| e.role == role)
                .filter(|e| department.is_none() || e.department_id == department)
                .filter_map(|e| e.user_id)
                .collect();
            ids.sort_unstable();
            ids
        };

        Ok(match audience {
            Audience::Employee(id) => inner
                .employees
                .get(&id)
                .and_then(|e| e.user_id)
                .into_iter()
                .collect(),
            Audience::User(id) => vec![id],
            Audience::Chiefs { department_id } => with_role(Role::Chief, Some(department_id)),
            Audience::Managers => with_role(Role::Manager, None),
            Audience::Admins => with_role(Role::Admin, None),
        })
    }

    async fn insert_notification(
        &self,
        user_id: u64,
        notice: &Notice,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner.next_notification_id += 1;
        let id = inner.next_notification_id;
        inner.notifications.push(Notification {
            id,
            user_id,
            kind: notice.kind,
            title: notice.title.clone(),
            message: notice.message.clone(),
            request_id: notice.request_id,
            missing_dates: notice.missing_dates.clone(),
            link: notice.link.clone(),
            read_at: None,
            created_at: now,
        });
        Ok(())
    }

    async fn delete_for_request(
        &self,
        kind: NotificationKind,
        request_id: u64,
    ) -> StoreResult<u64> {
        let mut inner = self.inner.lock();
        let before = inner.notifications.len();
        inner
            .notifications
            .retain(|n| !(n.kind == kind && n.request_id == Some(request_id)));
        Ok((before - inner.notifications.len()) as u64)
    }

    async fn has_unread(&self, user_id: u64, kind: NotificationKind) -> StoreResult<bool> {
        let inner = self.inner.lock();
        Ok(inner
            .notifications
            .iter()
            .any(|n| n.user_id == user_id && n.kind == kind && n.read_at.is_none()))
    }

    async fn notifications_for(
        &self,
        user_id: u64,
        limit: u32,
    ) -> StoreResult<Vec<Notification>> {
        let inner = self.inner.lock();
        let mut found: Vec<_> = inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|n| Reverse((n.created_at, n.id)));
        found.truncate(limit as usize);
        Ok(found)
    }

    async fn mark_read(&self, user_id: u64, id: u64, now: DateTime<Utc>) -> StoreResult<bool> {
        let mut inner = self.inner.lock();
        match inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(n) => {
                n.read_at.get_or_insert(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: u64, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner.lock();
        let mut count = 0;
        for n in inner
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && n.read_at.is_none())
        {
            n.read_at = Some(now);
            count += 1;
        }
        Ok(count)
    }

    async fn delete_all(&self, user_id: u64) -> StoreResult<u64> {
        let mut inner = self.inner.lock();
        let before = inner.notifications.len();
        inner.notifications.retain(|n| n.user_id != user_id);
        Ok((before - inner.notifications.len()) as u64)
    }
}
