pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod model;
pub mod routes;
pub mod service;
pub mod store;
pub mod workflow;

pub use api::{ApiResponse, AppState};
pub use config::Config;
pub use error::{AppError, AppResult};
