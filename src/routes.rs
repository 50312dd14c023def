use crate::{
    api::{cron, notifications, planning, requests},
    auth::middleware::auth_middleware,
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Per-scope limiter allowing `requests_per_min` with a burst of the same size.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = if requests_per_min == 0 {
        60_000
    } else {
        (60_000 / u64::from(requests_per_min)).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(|| {
            tracing::warn!(requests_per_min, "Invalid rate limit, using defaults");
            GovernorConfig::default()
        });
    Governor::new(&cfg)
}

/// Extractor failures answer with the same envelope as handler errors.
fn extractor_errors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    extractor_errors(cfg);

    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));
    let cron_limiter = Arc::new(build_limiter(config.rate_cron_per_min));

    // Scheduler hook, guarded by its own token instead of a bearer token
    cfg.service(
        web::scope("/cron").service(
            web::resource("/close-planning")
                .wrap(cron_limiter)
                .route(web::post().to(cron::close_planning)),
        ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/requests")
                    // /requests
                    .service(web::resource("").route(web::post().to(requests::create_request)))
                    .service(web::resource("/my").route(web::get().to(requests::my_requests)))
                    .service(web::resource("/unit").route(web::get().to(requests::unit_requests)))
                    .service(
                        web::resource("/pending-chief")
                            .route(web::get().to(requests::pending_chief)),
                    )
                    .service(
                        web::resource("/pending-manager")
                            .route(web::get().to(requests::pending_manager)),
                    )
                    .service(
                        web::resource("/manager/history")
                            .route(web::get().to(requests::manager_history)),
                    )
                    // /requests/{id}
                    .service(
                        web::resource("/{id}").route(web::put().to(requests::update_request)),
                    )
                    .service(
                        web::resource("/{id}/approve-chief")
                            .route(web::put().to(requests::approve_chief)),
                    )
                    .service(
                        web::resource("/{id}/approve-manager")
                            .route(web::put().to(requests::approve_manager)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(requests::reject_request)),
                    ),
            )
            .service(
                web::scope("/planificacion")
                    // /planificacion
                    .service(
                        web::resource("")
                            .route(web::get().to(planning::list_planning))
                            .route(web::post().to(planning::create_planning)),
                    )
                    .service(web::resource("/my-unit").route(web::get().to(planning::unit_planning)))
                    .service(web::resource("/week").route(web::get().to(planning::week_status)))
                    .service(
                        web::resource("/empleado/{employee_id}")
                            .route(web::get().to(planning::employee_planning)),
                    )
                    // /planificacion/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(planning::update_planning))
                            .route(web::delete().to(planning::delete_planning)),
                    ),
            )
            .service(
                web::scope("/notifications")
                    .service(
                        web::resource("").route(web::get().to(notifications::list_notifications)),
                    )
                    .service(
                        web::resource("/read-all").route(web::post().to(notifications::mark_all_read)),
                    )
                    .service(
                        web::resource("/delete-all")
                            .route(web::delete().to(notifications::delete_all)),
                    )
                    .service(
                        web::resource("/{id}/read").route(web::post().to(notifications::mark_read)),
                    ),
            ),
    );
}
