use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::model::notification::{Audience, Notice, NotificationKind};
use crate::model::request::{NewRequest, Request, RequestStatus, RequestType};
use crate::model::role::Role;
use crate::service::notifications::{Notifier, send, withdraw};
use crate::store::Store;
use crate::workflow::approval::{self, Action};
use crate::workflow::planning::business_days;

/// Drives requests through the chief -> manager approval chain.
#[derive(Clone)]
pub struct RequestService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl RequestService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn submit(&self, employee_id: u64, new: NewRequest) -> AppResult<Request> {
        new.validate()?;

        let request = self
            .store
            .insert_request(employee_id, &new, Utc::now())
            .await?;
        info!(
            request_id = request.id,
            employee_id,
            request_type = %request.request_type,
            "Request submitted"
        );

        match request.employee.as_ref().and_then(|e| e.department_id) {
            Some(department_id) => {
                let notice = Notice::new(
                    Audience::Chiefs { department_id },
                    NotificationKind::RequestCreated,
                    "New pending request",
                    format!(
                        "{} submitted a {} request.",
                        requester_name(&request),
                        request.request_type
                    ),
                )
                .for_request(request.id);
                send(self.notifier.as_ref(), notice).await;
            }
            None => info!(
                request_id = request.id,
                employee_id, "Requester has no unit; no chief to notify"
            ),
        }

        Ok(request)
    }

    pub async fn approve(&self, request_id: u64, role: Role) -> AppResult<Request> {
        let request = self.load(request_id).await?;
        self.apply_approval(request, role).await
    }

    /// Approval through a stage-specific entry point reserved for `stage`.
    ///
    /// A finished request still reports `InvalidState` to every caller; only
    /// then is a caller other than `stage` refused.
    pub async fn approve_as(&self, request_id: u64, role: Role, stage: Role) -> AppResult<Request> {
        let request = self.load(request_id).await?;
        if approval::required_approver(request.status).is_some() && role != stage {
            return Err(approval::TransitionError::Forbidden {
                role,
                status: request.status,
            }
            .into());
        }
        self.apply_approval(request, role).await
    }

    async fn apply_approval(&self, request: Request, role: Role) -> AppResult<Request> {
        let request_id = request.id;
        let next = approval::next_status(request.status, role, Action::Approve)?;
        let updated = self.commit(&request, next, None).await?;
        info!(request_id, %role, from = %request.status, to = %next, "Request approved");

        match next {
            RequestStatus::PendingAuthorization => {
                withdraw(self.notifier.as_ref(), NotificationKind::RequestCreated, request_id).await;
                let notice = Notice::new(
                    Audience::Managers,
                    NotificationKind::RequestPendingAuth,
                    "Request awaiting authorization",
                    format!(
                        "{} request from {} was approved by the unit chief.",
                        updated.request_type,
                        requester_name(&updated)
                    ),
                )
                .for_request(request_id);
                send(self.notifier.as_ref(), notice).await;
                self.notify_employee(
                    &updated,
                    "Your request was approved by your chief and sent to management.",
                )
                .await;
            }
            RequestStatus::Approved => {
                withdraw(self.notifier.as_ref(), NotificationKind::RequestPendingAuth, request_id)
                    .await;
                self.deduct_vacation(&updated).await;
                let notice = Notice::new(
                    Audience::Admins,
                    NotificationKind::RequestManagerFinalized,
                    "Request authorized by management",
                    format!(
                        "{} request from {} was authorized and needs administrative follow-up only.",
                        updated.request_type,
                        requester_name(&updated)
                    ),
                )
                .for_request(request_id);
                send(self.notifier.as_ref(), notice).await;
                self.notify_employee(
                    &updated,
                    "Your request was authorized by management. Administration has been notified.",
                )
                .await;
            }
            _ => {}
        }

        Ok(updated)
    }

    pub async fn reject(&self, request_id: u64, role: Role, reason: &str) -> AppResult<Request> {
        let request = self.load(request_id).await?;
        let next = approval::next_status(request.status, role, Action::Reject)?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("A rejection reason is required".into()));
        }

        let updated = self.commit(&request, next, Some(reason)).await?;
        info!(request_id, %role, from = %request.status, "Request rejected");

        let pending_kind = match request.status {
            RequestStatus::PendingApproval => Some(NotificationKind::RequestCreated),
            RequestStatus::PendingAuthorization => Some(NotificationKind::RequestPendingAuth),
            _ => None,
        };
        if let Some(kind) = pending_kind {
            withdraw(self.notifier.as_ref(), kind, request_id).await;
        }
        self.notify_employee(&updated, &format!("Your request was rejected. Reason: {reason}"))
            .await;

        Ok(updated)
    }

    /// Requests waiting on `role`, oldest first. `unit` narrows to one
    /// organizational unit.
    pub async fn list_pending_for_role(
        &self,
        role: Role,
        unit: Option<u64>,
    ) -> AppResult<Vec<Request>> {
        let status = [RequestStatus::PendingApproval, RequestStatus::PendingAuthorization]
            .into_iter()
            .find(|s| approval::required_approver(*s) == Some(role));

        match status {
            Some(status) => Ok(self.store.requests_with_status(status, unit).await?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn list_for_employee(&self, employee_id: u64) -> AppResult<Vec<Request>> {
        Ok(self.store.requests_by_employee(employee_id).await?)
    }

    pub async fn list_for_unit(&self, department_id: u64) -> AppResult<Vec<Request>> {
        Ok(self.store.requests_by_unit(department_id).await?)
    }

    pub async fn approved_history(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AppResult<Vec<Request>> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(AppError::Validation("start cannot be after end".into()));
            }
        }
        Ok(self.store.approved_between(start, end).await?)
    }

    /// Lets the owner reword a request nobody has acted on yet.
    pub async fn update_description(
        &self,
        request_id: u64,
        employee_id: u64,
        description: &str,
    ) -> AppResult<Request> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::Validation("description must not be empty".into()));
        }

        let request = self.load(request_id).await?;
        if request.employee_id != employee_id {
            return Err(AppError::Forbidden("Only the requester can edit a request".into()));
        }
        if request.status != RequestStatus::PendingApproval {
            return Err(AppError::InvalidState(format!(
                "Request is {} and can no longer be edited",
                request.status
            )));
        }

        if !self
            .store
            .update_description(request_id, employee_id, description, Utc::now())
            .await?
        {
            return Err(AppError::InvalidState(format!(
                "Request {request_id} was processed before the edit was saved"
            )));
        }

        self.load(request_id).await
    }

    async fn load(&self, request_id: u64) -> AppResult<Request> {
        self.store
            .find_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request {request_id} not found")))
    }

    async fn commit(
        &self,
        request: &Request,
        next: RequestStatus,
        rejection_reason: Option<&str>,
    ) -> AppResult<Request> {
        let now = Utc::now();
        let applied = self
            .store
            .update_status(request.id, request.status, next, rejection_reason, now)
            .await?;
        if !applied {
            return Err(AppError::InvalidState(format!(
                "Request {} was already processed",
                request.id
            )));
        }

        Ok(Request {
            status: next,
            rejection_reason: rejection_reason.map(str::to_string),
            updated_at: now,
            ..request.clone()
        })
    }

    async fn deduct_vacation(&self, request: &Request) {
        if request.request_type != RequestType::Vacation {
            return;
        }
        let (Some(start), Some(end)) = (request.start_date, request.end_date) else {
            return;
        };

        let days = business_days(start, end);
        match self
            .store
            .deduct_vacation_days(request.employee_id, days)
            .await
        {
            Ok(()) => info!(
                request_id = request.id,
                employee_id = request.employee_id,
                days,
                "Vacation balance deducted"
            ),
            Err(e) => error!(
                error = %e,
                request_id = request.id,
                employee_id = request.employee_id,
                days,
                "Failed to deduct vacation balance"
            ),
        }
    }

    async fn notify_employee(&self, request: &Request, message: &str) {
        let notice = Notice::new(
            Audience::Employee(request.employee_id),
            NotificationKind::RequestUpdate,
            "Request update",
            message,
        )
        .for_request(request.id);
        send(self.notifier.as_ref(), notice).await;
    }
}

fn requester_name(request: &Request) -> String {
    request
        .employee
        .as_ref()
        .map(|e| e.full_name.clone())
        .unwrap_or_else(|| format!("employee #{}", request.employee_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::Employee;
    use crate::service::notifications::StoreNotifier;
    use crate::store::{MemoryStore, RequestStore, StoreError, StoreResult};
    use async_trait::async_trait;

    struct BrokenNotifier;

    #[async_trait]
    impl Notifier for BrokenNotifier {
        async fn dispatch(&self, _notice: Notice) -> StoreResult<usize> {
            Err(StoreError::Corrupt("mail relay down".into()))
        }

        async fn retract(&self, _kind: NotificationKind, _request_id: u64) -> StoreResult<u64> {
            Err(StoreError::Corrupt("mail relay down".into()))
        }
    }

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
            vacation_days_balance: 20,
            active: true,
        }
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.add_employee(person(1, Role::Technician, 3));
        store.add_employee(person(2, Role::Chief, 3));
        store.add_employee(person(3, Role::Manager, 1));
        store.add_employee(person(4, Role::Admin, 1));
        store.add_employee(person(5, Role::Employee, 4));
        store
    }

    fn service(store: Arc<MemoryStore>) -> RequestService {
        let notifier = Arc::new(StoreNotifier::new(store.clone()));
        RequestService::new(store, notifier)
    }

    fn vacation() -> NewRequest {
        NewRequest {
            request_type: RequestType::Vacation,
            description: "Family trip".into(),
            start_date: Some(date("2025-06-02")),
            end_date: Some(date("2025-06-06")),
        }
    }

    fn materials(description: &str) -> NewRequest {
        NewRequest {
            request_type: RequestType::Materials,
            description: description.into(),
            start_date: None,
            end_date: None,
        }
    }

    #[actix_web::test]
    async fn vacation_runs_the_full_chain() {
        let store = seeded_store();
        let svc = service(store.clone());

        let request = svc.submit(1, vacation()).await.unwrap();
        assert_eq!(request.status, RequestStatus::PendingApproval);

        let request = svc.approve(request.id, Role::Chief).await.unwrap();
        assert_eq!(request.status, RequestStatus::PendingAuthorization);

        let request = svc.approve(request.id, Role::Manager).await.unwrap();
        assert_eq!(request.status, RequestStatus::Approved);
        assert!(request.rejection_reason.is_none());

        let err = svc.reject(request.id, Role::Manager, "too late").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        // five weekdays off a balance of 20
        assert_eq!(store.employee(1).unwrap().vacation_days_balance, 15);
    }

    #[actix_web::test]
    async fn permit_without_description_or_dates_creates_nothing() {
        let store = seeded_store();
        let svc = service(store.clone());
        let new = NewRequest {
            request_type: RequestType::Permit,
            description: String::new(),
            start_date: None,
            end_date: None,
        };

        assert!(matches!(svc.submit(1, new).await, Err(AppError::Validation(_))));
        assert!(svc.list_for_employee(1).await.unwrap().is_empty());
        assert!(store.all_notifications().is_empty());
    }

    #[actix_web::test]
    async fn chief_cannot_approve_second_stage_but_manager_can_reject_either() {
        let svc = service(seeded_store());

        let first = svc.submit(1, materials("gloves")).await.unwrap();
        let rejected = svc.reject(first.id, Role::Manager, "no budget").await.unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("no budget"));

        let second = svc.submit(1, materials("boots")).await.unwrap();
        svc.approve(second.id, Role::Chief).await.unwrap();
        let err = svc.approve(second.id, Role::Chief).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let rejected = svc.reject(second.id, Role::Manager, "duplicate").await.unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
    }

    #[actix_web::test]
    async fn terminal_requests_are_never_mutated() {
        let store = seeded_store();
        let svc = service(store.clone());

        let request = svc.submit(1, materials("gloves")).await.unwrap();
        let rejected = svc.reject(request.id, Role::Chief, "not needed").await.unwrap();

        for result in [
            svc.approve(request.id, Role::Chief).await,
            svc.approve(request.id, Role::Manager).await,
            svc.reject(request.id, Role::Manager, "again").await,
        ] {
            assert!(matches!(result, Err(AppError::InvalidState(_))));
        }

        let stored = store.find_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Rejected);
        assert_eq!(stored.rejection_reason.as_deref(), Some("not needed"));
        assert_eq!(stored.updated_at, rejected.updated_at);
    }

    #[actix_web::test]
    async fn stage_entry_point_reports_state_before_role() {
        let svc = service(seeded_store());
        let request = svc.submit(1, materials("gloves")).await.unwrap();

        let err = svc.approve_as(request.id, Role::Manager, Role::Chief).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let request = svc.approve_as(request.id, Role::Chief, Role::Chief).await.unwrap();
        // the manager stage is not reachable through the chief entry point
        let err = svc.approve_as(request.id, Role::Manager, Role::Chief).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        svc.approve_as(request.id, Role::Manager, Role::Manager).await.unwrap();
        let err = svc.approve_as(request.id, Role::Manager, Role::Chief).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[actix_web::test]
    async fn unknown_request_is_not_found() {
        let svc = service(seeded_store());
        assert!(matches!(svc.approve(77, Role::Chief).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.reject(77, Role::Manager, "x").await, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn reject_requires_reason() {
        let svc = service(seeded_store());
        let request = svc.submit(1, materials("gloves")).await.unwrap();
        let err = svc.reject(request.id, Role::Chief, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let stored = svc.list_for_employee(1).await.unwrap();
        assert_eq!(stored[0].status, RequestStatus::PendingApproval);
    }

    #[actix_web::test]
    async fn stale_transition_loses_the_race() {
        let store = seeded_store();
        let svc = service(store.clone());
        let request = svc.submit(1, materials("gloves")).await.unwrap();

        // another approver got there first
        assert!(
            store
                .update_status(
                    request.id,
                    RequestStatus::PendingApproval,
                    RequestStatus::PendingAuthorization,
                    None,
                    Utc::now()
                )
                .await
                .unwrap()
        );

        let err = svc.commit(&request, RequestStatus::Rejected, Some("late")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[actix_web::test]
    async fn notification_failure_does_not_roll_back() {
        let store = seeded_store();
        let svc = RequestService::new(store.clone(), Arc::new(BrokenNotifier));

        let request = svc.submit(1, materials("gloves")).await.unwrap();
        let approved = svc.approve(request.id, Role::Chief).await.unwrap();
        assert_eq!(approved.status, RequestStatus::PendingAuthorization);

        let stored = store.find_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::PendingAuthorization);
    }

    #[actix_web::test]
    async fn notifications_follow_the_chain() {
        let store = seeded_store();
        let svc = service(store.clone());

        let request = svc.submit(1, materials("gloves")).await.unwrap();
        let kinds = |store: &MemoryStore| {
            store
                .all_notifications()
                .into_iter()
                .map(|n| (n.user_id, n.kind))
                .collect::<Vec<_>>()
        };
        assert_eq!(kinds(&store), vec![(102, NotificationKind::RequestCreated)]);

        svc.approve(request.id, Role::Chief).await.unwrap();
        assert_eq!(
            kinds(&store),
            vec![
                (103, NotificationKind::RequestPendingAuth),
                (101, NotificationKind::RequestUpdate),
            ]
        );

        svc.approve(request.id, Role::Manager).await.unwrap();
        assert_eq!(
            kinds(&store),
            vec![
                (101, NotificationKind::RequestUpdate),
                (104, NotificationKind::RequestManagerFinalized),
                (101, NotificationKind::RequestUpdate),
            ]
        );
    }

    #[actix_web::test]
    async fn pending_lists_are_role_specific_and_oldest_first() {
        let svc = service(seeded_store());
        let a = svc.submit(1, materials("a")).await.unwrap();
        let b = svc.submit(1, materials("b")).await.unwrap();
        let c = svc.submit(5, materials("c")).await.unwrap();
        svc.approve(b.id, Role::Chief).await.unwrap();

        let chief: Vec<_> = svc
            .list_pending_for_role(Role::Chief, None)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(chief, vec![a.id, c.id]);

        let unit_only: Vec<_> = svc
            .list_pending_for_role(Role::Chief, Some(3))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(unit_only, vec![a.id]);

        let manager = svc.list_pending_for_role(Role::Manager, None).await.unwrap();
        assert_eq!(manager.len(), 1);
        assert_eq!(manager[0].id, b.id);

        assert!(svc.list_pending_for_role(Role::Admin, None).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn owner_may_edit_only_before_approval() {
        let svc = service(seeded_store());
        let request = svc.submit(1, materials("gloves")).await.unwrap();

        let edited = svc.update_description(request.id, 1, "leather gloves").await.unwrap();
        assert_eq!(edited.description, "leather gloves");

        let err = svc.update_description(request.id, 5, "mine now").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        svc.approve(request.id, Role::Chief).await.unwrap();
        let err = svc.update_description(request.id, 1, "too late").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[actix_web::test]
    async fn history_lists_approved_in_range() {
        let svc = service(seeded_store());
        let request = svc.submit(1, materials("gloves")).await.unwrap();
        svc.approve(request.id, Role::Chief).await.unwrap();
        svc.approve(request.id, Role::Manager).await.unwrap();
        svc.submit(1, materials("pending")).await.unwrap();

        let today = Utc::now().date_naive();
        let history = svc.approved_history(Some(today), Some(today)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, request.id);

        let inverted = svc
            .approved_history(Some(today), Some(today - chrono::Duration::days(1)))
            .await;
        assert!(matches!(inverted, Err(AppError::Validation(_))));
    }
}
