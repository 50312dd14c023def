use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::model::notification::{Audience, Notice, NotificationKind};
use crate::model::planning::{NewPlanningEntry, PlanningEntry, PlanningScope};
use crate::model::role::Role;
use crate::service::notifications::{Notifier, send};
use crate::store::Store;
use crate::workflow::planning::{self, ReminderPolicy};

pub const PLANNING_LINK: &str = "/portal/planificacion";

/// Completion of one employee's work week as seen on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WeekStatus {
    #[schema(example = "2025-06-02", format = "date", value_type = String)]
    pub week_start: NaiveDate,
    #[schema(value_type = Vec<String>)]
    pub days: Vec<NaiveDate>,
    #[schema(value_type = Vec<String>)]
    pub missing: Vec<NaiveDate>,
    pub policy: ReminderPolicy,
}

impl WeekStatus {
    /// Builds the status from entries already fetched for the week.
    pub fn from_entries(employee_id: u64, today: NaiveDate, entries: &[PlanningEntry]) -> Self {
        let days = planning::work_week(today).to_vec();
        let missing = planning::missing_weekdays(employee_id, today, entries);
        let planned = days.len() - missing.len();
        Self {
            week_start: days[0],
            policy: planning::reminder_policy(today.weekday(), planned),
            days,
            missing,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Clone)]
pub struct PlanningService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl PlanningService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn create(&self, entry: NewPlanningEntry) -> AppResult<PlanningEntry> {
        entry.validate()?;
        self.ensure_free_day(&entry, None).await?;

        let stored = self.store.insert_entry(&entry, Utc::now()).await?;
        info!(
            entry_id = stored.id,
            employee_id = stored.employee_id,
            date = %stored.date,
            "Planning entry created"
        );
        Ok(stored)
    }

    pub async fn update(&self, id: u64, entry: NewPlanningEntry) -> AppResult<PlanningEntry> {
        entry.validate()?;
        self.ensure_free_day(&entry, Some(id)).await?;

        self.store
            .update_entry(id, &entry, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Planning entry {id} not found")))
    }

    pub async fn delete(&self, id: u64) -> AppResult<()> {
        if !self.store.delete_entry(id).await? {
            return Err(AppError::NotFound(format!("Planning entry {id} not found")));
        }
        info!(entry_id = id, "Planning entry deleted");
        Ok(())
    }

    pub async fn find(&self, id: u64) -> AppResult<PlanningEntry> {
        self.store
            .find_entry(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Planning entry {id} not found")))
    }

    pub async fn list(&self, scope: PlanningScope) -> AppResult<Vec<PlanningEntry>> {
        Ok(self.store.entries(scope).await?)
    }

    pub async fn week_status(&self, employee_id: u64, today: NaiveDate) -> AppResult<WeekStatus> {
        let week = planning::work_week(today);
        let entries = self
            .store
            .entries_between(employee_id, week[0], week[planning::WORK_WEEK_DAYS - 1])
            .await?;
        Ok(WeekStatus::from_entries(employee_id, today, &entries))
    }

    /// Leaves a reminder in the user's inbox when the week has gaps.
    ///
    /// Returns whether a reminder was created. At most one unread reminder
    /// is kept per user.
    pub async fn remind(
        &self,
        user_id: u64,
        role: Role,
        employee_id: Option<u64>,
        today: NaiveDate,
    ) -> AppResult<bool> {
        if !role.plans_weekly() {
            return Ok(false);
        }
        let Some(employee_id) = employee_id else {
            return Ok(false);
        };

        let status = self.week_status(employee_id, today).await?;
        if status.is_complete() {
            return Ok(false);
        }
        if self
            .store
            .has_unread(user_id, NotificationKind::PlanningReminder)
            .await?
        {
            debug!(user_id, "Planning reminder already pending");
            return Ok(false);
        }

        let notice = Notice::new(
            Audience::User(user_id),
            NotificationKind::PlanningReminder,
            "Weekly planning incomplete",
            format!(
                "You have {} day(s) without planning this week.",
                status.missing.len()
            ),
        )
        .with_missing_dates(status.missing)
        .with_link(PLANNING_LINK);
        send(self.notifier.as_ref(), notice).await;
        Ok(true)
    }

    /// Fills every unplanned weekday of the week with a placeholder entry and
    /// tells the unit chief. Returns how many employees were filled in.
    pub async fn close_week(&self, today: NaiveDate) -> AppResult<usize> {
        let week = planning::work_week(planning::closing_week_monday(today));
        let (monday, friday) = (week[0], week[planning::WORK_WEEK_DAYS - 1]);
        let mut filled = 0;

        for employee in self.store.active_planners().await? {
            let entries = self
                .store
                .entries_between(employee.id, monday, friday)
                .await?;
            let missing = planning::missing_weekdays(employee.id, monday, &entries);
            if missing.is_empty() {
                continue;
            }

            let now = Utc::now();
            for day in &missing {
                self.store
                    .insert_entry(&NewPlanningEntry::placeholder(employee.id, *day), now)
                    .await?;
            }
            filled += 1;
            info!(
                employee_id = employee.id,
                missing = missing.len(),
                week_start = %monday,
                "Filled unplanned days"
            );

            if let Some(department_id) = employee.department_id {
                let notice = Notice::new(
                    Audience::Chiefs { department_id },
                    NotificationKind::PlanningIncomplete,
                    "Incomplete weekly planning",
                    format!(
                        "{} did not plan {} day(s) of the week starting {monday}.",
                        employee.full_name,
                        missing.len()
                    ),
                )
                .with_missing_dates(missing)
                .with_link(PLANNING_LINK);
                send(self.notifier.as_ref(), notice).await;
            }
        }

        Ok(filled)
    }

    async fn ensure_free_day(&self, entry: &NewPlanningEntry, excluding: Option<u64>) -> AppResult<()> {
        if self
            .store
            .entry_exists(entry.employee_id, entry.date, excluding)
            .await?
        {
            return Err(AppError::Validation(format!(
                "A planning entry already exists for {} on this date",
                entry.date
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::Employee;
    use crate::service::notifications::StoreNotifier;
    use crate::store::{MemoryStore, NotificationStore};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn person(id: u64, role: Role, department_id: u64) -> Employee {
        Employee {
            id,
            user_id: Some(100 + id),
            full_name: format!("Person {id}"),
            department_id: Some(department_id),
            role,
            vacation_days_balance: 0,
            active: true,
        }
    }

    fn entry(employee_id: u64, day: &str) -> NewPlanningEntry {
        NewPlanningEntry {
            employee_id,
            date: date(day),
            location: "San Juan".into(),
            sector: "Rural".into(),
            area: "Watershed".into(),
            resources: "Pickup".into(),
            service_line: "Environment".into(),
            duration: "8h".into(),
            description: "Inspection".into(),
        }
    }

    fn setup() -> (Arc<MemoryStore>, PlanningService) {
        let store = Arc::new(MemoryStore::new());
        store.add_employee(person(1, Role::Technician, 3));
        store.add_employee(person(2, Role::Chief, 3));
        store.add_employee(person(3, Role::Manager, 1));
        let notifier = Arc::new(StoreNotifier::new(store.clone()));
        let svc = PlanningService::new(store.clone(), notifier);
        (store, svc)
    }

    #[actix_web::test]
    async fn second_entry_for_same_day_is_rejected() {
        let (_, svc) = setup();
        let first = svc.create(entry(1, "2025-06-02")).await.unwrap();

        let err = svc.create(entry(1, "2025-06-02")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // editing an entry in place is not a duplicate of itself
        let mut edited = entry(1, "2025-06-02");
        edited.location = "La Paz".into();
        let updated = svc.update(first.id, edited).await.unwrap();
        assert_eq!(updated.location, "La Paz");

        let other = svc.create(entry(1, "2025-06-03")).await.unwrap();
        let err = svc.update(other.id, entry(1, "2025-06-02")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn update_and_delete_unknown_entry() {
        let (_, svc) = setup();
        assert!(matches!(svc.update(9, entry(1, "2025-06-02")).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.delete(9).await, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn blank_fields_are_rejected() {
        let (_, svc) = setup();
        let mut blank = entry(1, "2025-06-02");
        blank.sector = "  ".into();
        assert!(matches!(svc.create(blank).await, Err(AppError::Validation(_))));
    }

    #[actix_web::test]
    async fn week_status_reports_gaps_and_policy() {
        let (_, svc) = setup();
        svc.create(entry(1, "2025-06-02")).await.unwrap();
        svc.create(entry(1, "2025-06-04")).await.unwrap();
        // previous week does not count
        svc.create(entry(1, "2025-05-30")).await.unwrap();

        let wednesday = svc.week_status(1, date("2025-06-04")).await.unwrap();
        assert_eq!(wednesday.week_start, date("2025-06-02"));
        assert_eq!(wednesday.days.len(), 5);
        assert_eq!(
            wednesday.missing,
            vec![date("2025-06-03"), date("2025-06-05"), date("2025-06-06")]
        );
        assert_eq!(wednesday.policy, ReminderPolicy::SoftWarning);

        let sunday = svc.week_status(1, date("2025-06-01")).await.unwrap();
        assert_eq!(sunday.week_start, date("2025-06-02"));
        assert_eq!(sunday.policy, ReminderPolicy::None);
    }

    #[actix_web::test]
    async fn reminder_is_created_once_until_read() {
        let (store, svc) = setup();
        let today = date("2025-06-05");

        assert!(svc.remind(101, Role::Technician, Some(1), today).await.unwrap());
        assert!(!svc.remind(101, Role::Technician, Some(1), today).await.unwrap());

        let inbox = store.all_notifications();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::PlanningReminder);
        assert_eq!(inbox[0].missing_dates.len(), 5);
        assert_eq!(inbox[0].link.as_deref(), Some(PLANNING_LINK));

        store.mark_all_read(101, Utc::now()).await.unwrap();
        assert!(svc.remind(101, Role::Technician, Some(1), today).await.unwrap());
    }

    #[actix_web::test]
    async fn managers_and_unlinked_users_are_not_reminded() {
        let (store, svc) = setup();
        let today = date("2025-06-05");
        assert!(!svc.remind(103, Role::Manager, Some(3), today).await.unwrap());
        assert!(!svc.remind(150, Role::Employee, None, today).await.unwrap());
        assert!(store.all_notifications().is_empty());
    }

    #[actix_web::test]
    async fn complete_week_needs_no_reminder() {
        let (_, svc) = setup();
        for day in ["2025-06-02", "2025-06-03", "2025-06-04", "2025-06-05", "2025-06-06"] {
            svc.create(entry(1, day)).await.unwrap();
        }
        assert!(!svc.remind(101, Role::Technician, Some(1), date("2025-06-06")).await.unwrap());
    }

    #[actix_web::test]
    async fn close_week_fills_gaps_and_tells_the_chief() {
        let (store, svc) = setup();
        for day in ["2025-06-02", "2025-06-03", "2025-06-04", "2025-06-05", "2025-06-06"] {
            svc.create(entry(2, day)).await.unwrap();
        }
        svc.create(entry(1, "2025-06-03")).await.unwrap();

        let saturday = date("2025-06-07");
        assert_eq!(svc.close_week(saturday).await.unwrap(), 1);

        let entries = svc.list(PlanningScope::Employee(1)).await.unwrap();
        assert_eq!(entries.len(), 5);
        let placeholders = entries.iter().filter(|e| e.location == "N/A").count();
        assert_eq!(placeholders, 4);

        // the manager is exempt
        assert!(svc.list(PlanningScope::Employee(3)).await.unwrap().is_empty());

        let inbox = store.all_notifications();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].user_id, 102);
        assert_eq!(inbox[0].kind, NotificationKind::PlanningIncomplete);
        assert_eq!(inbox[0].missing_dates.len(), 4);

        // a second run finds nothing left to fill
        assert_eq!(svc.close_week(saturday).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn sunday_close_settles_the_week_that_just_ended() {
        let (_, svc) = setup();
        svc.create(entry(1, "2025-06-04")).await.unwrap();

        let sunday = date("2025-06-08");
        assert!(svc.close_week(sunday).await.unwrap() >= 1);

        let mut placeholders: Vec<NaiveDate> = svc
            .list(PlanningScope::Employee(1))
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.location == "N/A")
            .map(|e| e.date)
            .collect();
        placeholders.sort();
        assert_eq!(
            placeholders,
            vec![date("2025-06-02"), date("2025-06-03"), date("2025-06-05"), date("2025-06-06")]
        );

        // the coming week is left open for real planning
        svc.create(entry(1, "2025-06-09")).await.unwrap();
    }
}
