#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::test::TestRequest;

use portal::auth::jwt::{Claims, issue_token};
use portal::model::employee::Employee;
use portal::model::role::Role;
use portal::store::MemoryStore;
use portal::{AppState, Config};

pub const SECRET: &str = "integration-secret";
pub const ISSUER: &str = "cih-backend";

pub const TECHNICIAN: u64 = 1;
pub const CHIEF: u64 = 2;
pub const MANAGER: u64 = 3;
pub const ADMIN: u64 = 4;

pub fn config() -> Config {
    Config {
        database_url: "mysql://unused".into(),
        jwt_secret: SECRET.into(),
        jwt_issuer: ISSUER.into(),
        server_addr: "127.0.0.1:0".into(),
        rate_protected_per_min: 1000,
        rate_cron_per_min: 6,
        api_prefix: "/api".into(),
        cron_token: Some("cron-secret".into()),
        utc_offset_minutes: -360,
        log_level: "debug".into(),
        notification_limit: 50,
    }
}

fn employee(id: u64, role: Role, department_id: u64) -> Employee {
    Employee {
        id,
        user_id: Some(user_of(id)),
        full_name: format!("Employee {id}"),
        department_id: Some(department_id),
        role,
        vacation_days_balance: 15,
        active: true,
    }
}

/// User account linked to each seeded employee.
pub fn user_of(employee_id: u64) -> u64 {
    100 + employee_id
}

pub fn seeded() -> (Arc<MemoryStore>, AppState) {
    let store = Arc::new(MemoryStore::new());
    store.add_employee(employee(TECHNICIAN, Role::Technician, 3));
    store.add_employee(employee(CHIEF, Role::Chief, 3));
    store.add_employee(employee(MANAGER, Role::Manager, 1));
    store.add_employee(employee(ADMIN, Role::Admin, 1));
    let state = AppState::new(store.clone(), &config());
    (store, state)
}

/// Bearer token for a seeded employee, carrying `role` as given.
pub fn token(employee_id: u64, role: &str) -> String {
    let department = if employee_id <= CHIEF { 3 } else { 1 };
    let claims = Claims::new(
        user_of(employee_id),
        format!("employee{employee_id}@cih.hn"),
        role,
        Some(employee_id),
        Some(department),
        ISSUER,
        600,
    );
    issue_token(&claims, SECRET).unwrap()
}

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

/// Test request with a peer address, which the rate limiter keys on.
pub fn call(req: TestRequest, uri: &str) -> TestRequest {
    req.uri(uri).peer_addr(peer())
}

pub fn authed(req: TestRequest, uri: &str, token: &str) -> TestRequest {
    call(req, uri).insert_header(("Authorization", format!("Bearer {token}")))
}

#[macro_export]
macro_rules! portal_app {
    ($state:expr) => {
        $crate::portal_app!($state, $crate::common::config())
    };
    ($state:expr, $config:expr) => {{
        let config: portal::Config = $config;
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state))
                .app_data(actix_web::web::Data::new(config.clone()))
                .configure(|cfg| portal::routes::configure(cfg, config.clone())),
        )
        .await
    }};
}
