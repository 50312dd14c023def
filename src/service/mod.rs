pub mod notifications;
pub mod planning;
pub mod requests;

pub use notifications::{NotificationService, Notifier, StoreNotifier};
pub use planning::{PlanningService, WeekStatus};
pub use requests::RequestService;
