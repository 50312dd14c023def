//! HTTP handlers. Every response, success or failure, uses the
//! `{success, data?, message?}` envelope.

use std::sync::Arc;

use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::service::{NotificationService, PlanningService, RequestService, StoreNotifier};
use crate::store::Store;

pub mod cron;
pub mod notifications;
pub mod planning;
pub mod requests;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

pub(crate) fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(data))
}

/// Services shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub requests: RequestService,
    pub planning: PlanningService,
    pub notifications: NotificationService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        let notifier = Arc::new(StoreNotifier::new(store.clone()));
        Self {
            requests: RequestService::new(store.clone(), notifier.clone()),
            planning: PlanningService::new(store.clone(), notifier),
            notifications: NotificationService::new(store, config.notification_limit),
        }
    }
}
