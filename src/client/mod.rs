//! Typed client for the portal REST API.
//!
//! Every call goes through one [`CircuitBreaker`]: transport errors and
//! non-2xx responses count as failures, and once the breaker halts, calls
//! fail with [`ClientError::Halted`] without touching the network until
//! [`PortalClient::reset`] is called.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::ApiResponse;
use crate::model::planning::PlanningEntry;
use crate::model::request::{NewRequest, Request};
use crate::service::WeekStatus;

pub mod breaker;

pub use breaker::{CircuitBreaker, DEFAULT_FAILURE_THRESHOLD};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with `success: false` or a non-2xx status.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("Service temporarily suspended after repeated failures; reset to retry")]
    Halted,

    #[error("Unexpected response: {0}")]
    Decode(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root including the prefix, e.g. `http://localhost:8080/api`.
    pub base_url: String,
    pub token: Option<String>,
    pub failure_threshold: u32,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    breaker: Arc<CircuitBreaker>,
}

impl PortalClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let breaker = Arc::new(CircuitBreaker::new(config.failure_threshold));
        Self::with_breaker(config, breaker)
    }

    /// Shares `breaker` with other clients so failures anywhere halt them all.
    pub fn with_breaker(config: ClientConfig, breaker: Arc<CircuitBreaker>) -> ClientResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
            breaker,
        })
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn is_halted(&self) -> bool {
        self.breaker.is_halted()
    }

    pub fn reset(&self) {
        self.breaker.reset();
    }

    pub async fn submit_request(&self, new: &NewRequest) -> ClientResult<Request> {
        self.call(self.request(Method::POST, "/requests").json(new))
            .await
    }

    pub async fn my_requests(&self) -> ClientResult<Vec<Request>> {
        self.call(self.request(Method::GET, "/requests/my")).await
    }

    pub async fn unit_requests(&self) -> ClientResult<Vec<Request>> {
        self.call(self.request(Method::GET, "/requests/unit")).await
    }

    pub async fn pending_chief(&self) -> ClientResult<Vec<Request>> {
        self.call(self.request(Method::GET, "/requests/pending-chief"))
            .await
    }

    pub async fn pending_manager(&self) -> ClientResult<Vec<Request>> {
        self.call(self.request(Method::GET, "/requests/pending-manager"))
            .await
    }

    pub async fn approve_chief(&self, request_id: u64) -> ClientResult<Request> {
        let path = format!("/requests/{request_id}/approve-chief");
        self.call(self.request(Method::PUT, &path)).await
    }

    pub async fn approve_manager(&self, request_id: u64) -> ClientResult<Request> {
        let path = format!("/requests/{request_id}/approve-manager");
        self.call(self.request(Method::PUT, &path)).await
    }

    pub async fn reject(&self, request_id: u64, reason: &str) -> ClientResult<Request> {
        let path = format!("/requests/{request_id}/reject");
        self.call(
            self.request(Method::PUT, &path)
                .json(&json!({ "reason": reason })),
        )
        .await
    }

    pub async fn manager_history(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ClientResult<Vec<Request>> {
        #[derive(Serialize)]
        struct Range {
            #[serde(skip_serializing_if = "Option::is_none")]
            start: Option<NaiveDate>,
            #[serde(skip_serializing_if = "Option::is_none")]
            end: Option<NaiveDate>,
        }

        self.call(
            self.request(Method::GET, "/requests/manager/history")
                .query(&Range { start, end }),
        )
        .await
    }

    pub async fn employee_planning(&self, employee_id: u64) -> ClientResult<Vec<PlanningEntry>> {
        let path = format!("/planificacion/empleado/{employee_id}");
        self.call(self.request(Method::GET, &path)).await
    }

    /// Fetches the employee's planning and evaluates the week around `today`
    /// locally.
    pub async fn week_status(&self, employee_id: u64, today: NaiveDate) -> ClientResult<WeekStatus> {
        let entries = self.employee_planning(employee_id).await?;
        Ok(WeekStatus::from_entries(employee_id, today, &entries))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{path}", self.base_url));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn call<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        if self.breaker.is_halted() {
            debug!("Skipping call while halted");
            return Err(ClientError::Halted);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Portal API unreachable");
                self.breaker.record_failure();
                return Err(ClientError::Transport(e));
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                self.breaker.record_failure();
                return Err(ClientError::Transport(e));
            }
        };

        if !status.is_success() {
            self.breaker.record_failure();
            let message = serde_json::from_slice::<ApiResponse<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string()
                });
            warn!(status = status.as_u16(), %message, "Portal API call failed");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        self.breaker.record_success();

        let envelope: ApiResponse<T> =
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))?;
        if !envelope.success {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "Request was not successful".to_string()),
            });
        }
        envelope
            .data
            .ok_or_else(|| ClientError::Decode("response carried no data".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on the discard port, so every call is a transport error.
    fn unreachable_client() -> PortalClient {
        let config = ClientConfig {
            timeout: Duration::from_secs(2),
            ..ClientConfig::new("http://127.0.0.1:9/api")
        };
        PortalClient::new(config).unwrap()
    }

    #[actix_web::test]
    async fn halts_after_five_transport_errors() {
        let client = unreachable_client();

        for _ in 0..5 {
            assert!(matches!(
                client.my_requests().await,
                Err(ClientError::Transport(_))
            ));
        }
        assert!(client.is_halted());

        // halted calls never reach the transport
        assert!(matches!(client.approve_chief(1).await, Err(ClientError::Halted)));
        assert_eq!(client.breaker().consecutive_failures(), 5);

        client.reset();
        assert!(!client.is_halted());
        assert!(matches!(
            client.pending_chief().await,
            Err(ClientError::Transport(_))
        ));
        assert_eq!(client.breaker().consecutive_failures(), 1);
    }

    #[actix_web::test]
    async fn shared_breaker_halts_every_client() {
        let breaker = Arc::new(CircuitBreaker::default());
        for _ in 0..DEFAULT_FAILURE_THRESHOLD {
            breaker.record_failure();
        }

        let client =
            PortalClient::with_breaker(ClientConfig::new("http://127.0.0.1:9/api"), breaker)
                .unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 4).unwrap();
        assert!(matches!(client.week_status(7, today).await, Err(ClientError::Halted)));
    }

    #[test]
    fn base_url_is_normalized() {
        let client = PortalClient::new(ClientConfig::new("http://portal.local/api/")).unwrap();
        assert_eq!(client.base_url, "http://portal.local/api");
    }
}
