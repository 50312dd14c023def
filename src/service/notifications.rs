use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::model::notification::{Notice, Notification, NotificationKind};
use crate::store::{Store, StoreResult};

/// Delivery side of notifications.
///
/// Callers treat delivery as fire-and-forget: use [`send`] and [`withdraw`],
/// which log failures instead of returning them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `notice` to every user in its audience; returns how many.
    async fn dispatch(&self, notice: Notice) -> StoreResult<usize>;

    /// Removes notices of `kind` about `request_id` that no longer need action.
    async fn retract(&self, kind: NotificationKind, request_id: u64) -> StoreResult<u64>;
}

pub async fn send(notifier: &dyn Notifier, notice: Notice) {
    let kind = notice.kind;
    let request_id = notice.request_id;
    match notifier.dispatch(notice).await {
        Ok(delivered) => debug!(%kind, ?request_id, delivered, "Notification dispatched"),
        Err(e) => warn!(error = %e, %kind, ?request_id, "Notification dispatch failed"),
    }
}

pub async fn withdraw(notifier: &dyn Notifier, kind: NotificationKind, request_id: u64) {
    if let Err(e) = notifier.retract(kind, request_id).await {
        warn!(error = %e, %kind, request_id, "Failed to retract notifications");
    }
}

/// Writes notices into the inbox table of the store.
pub struct StoreNotifier {
    store: Arc<dyn Store>,
}

impl StoreNotifier {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn dispatch(&self, notice: Notice) -> StoreResult<usize> {
        let recipients = self.store.recipients(notice.audience).await?;
        let now = Utc::now();
        for user_id in &recipients {
            self.store.insert_notification(*user_id, &notice, now).await?;
        }
        Ok(recipients.len())
    }

    async fn retract(&self, kind: NotificationKind, request_id: u64) -> StoreResult<u64> {
        self.store.delete_for_request(kind, request_id).await
    }
}

/// Inbox side: what a signed-in user reads and clears.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
    limit: u32,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>, limit: u32) -> Self {
        Self { store, limit }
    }

    pub async fn list(&self, user_id: u64) -> AppResult<Vec<Notification>> {
        Ok(self.store.notifications_for(user_id, self.limit).await?)
    }

    pub async fn mark_read(&self, user_id: u64, id: u64) -> AppResult<()> {
        if self.store.mark_read(user_id, id, Utc::now()).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Notification {id} not found")))
        }
    }

    pub async fn mark_all_read(&self, user_id: u64) -> AppResult<u64> {
        Ok(self.store.mark_all_read(user_id, Utc::now()).await?)
    }

    pub async fn delete_all(&self, user_id: u64) -> AppResult<u64> {
        Ok(self.store.delete_all(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::Employee;
    use crate::model::notification::Audience;
    use crate::model::role::Role;
    use crate::store::MemoryStore;

    fn employee(id: u64, user_id: u64, role: Role, department_id: u64) -> Employee {
        Employee {
            id,
            user_id: Some(user_id),
            full_name: format!("Employee {id}"),
            department_id: Some(department_id),
            role,
            vacation_days_balance: 10,
            active: true,
        }
    }

    fn setup() -> (Arc<MemoryStore>, StoreNotifier, NotificationService) {
        let store = Arc::new(MemoryStore::new());
        store.add_employee(employee(1, 101, Role::Chief, 3));
        store.add_employee(employee(2, 102, Role::Chief, 4));
        store.add_employee(employee(3, 103, Role::Manager, 1));
        store.add_employee(employee(4, 104, Role::Technician, 3));
        let notifier = StoreNotifier::new(store.clone());
        let service = NotificationService::new(store.clone(), 2);
        (store, notifier, service)
    }

    #[actix_web::test]
    async fn chiefs_audience_is_scoped_to_unit() {
        let (store, notifier, _) = setup();
        let notice = Notice::new(
            Audience::Chiefs { department_id: 3 },
            NotificationKind::RequestCreated,
            "New request",
            "pending",
        )
        .for_request(9);

        assert_eq!(notifier.dispatch(notice).await.unwrap(), 1);
        let all = store.all_notifications();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user_id, 101);
        assert_eq!(all[0].request_id, Some(9));
    }

    #[actix_web::test]
    async fn retract_only_touches_matching_request() {
        let (store, notifier, _) = setup();
        for request_id in [1, 2] {
            let notice = Notice::new(Audience::Managers, NotificationKind::RequestPendingAuth, "t", "m")
                .for_request(request_id);
            notifier.dispatch(notice).await.unwrap();
        }
        assert_eq!(notifier.retract(NotificationKind::RequestPendingAuth, 1).await.unwrap(), 1);
        let left = store.all_notifications();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].request_id, Some(2));
    }

    #[actix_web::test]
    async fn inbox_is_capped_and_clearable() {
        let (_, notifier, service) = setup();
        for i in 0..3 {
            let notice =
                Notice::new(Audience::User(104), NotificationKind::RequestUpdate, "t", format!("m{i}"));
            notifier.dispatch(notice).await.unwrap();
        }

        let inbox = service.list(104).await.unwrap();
        assert_eq!(inbox.len(), 2);

        service.mark_read(104, inbox[0].id).await.unwrap();
        assert!(matches!(service.mark_read(999, inbox[0].id).await, Err(AppError::NotFound(_))));
        assert_eq!(service.mark_all_read(104).await.unwrap(), 2);
        assert_eq!(service.delete_all(104).await.unwrap(), 3);
        assert!(service.list(104).await.unwrap().is_empty());
    }
}
