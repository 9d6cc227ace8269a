//! HTTP API application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: infrastructure wiring (store, bus, registry, worker
//!   pool, realtime bridge)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: response body helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::cors::CorsLayer;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Must run inside a tokio runtime: service wiring spawns the bus bridge and
/// the retention sweep.
pub fn build_app(config: &ApiConfig) -> Router {
    let jwt = Arc::new(careerforge_auth::Hs256JwtValidator::new(
        config.jwt_secret.as_bytes(),
    ));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::build_services(config));
    spawn_cleanup_task(services.clone(), config);

    // Protected routes: bearer auth resolves the user context up front.
    let protected = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state.clone(),
            middleware::auth_middleware,
        ));

    // The notification gateway authenticates in-handler: EventSource clients
    // cannot set headers, so it also accepts a query-string token.
    let gateway = routes::stream::router()
        .layer(Extension(services))
        .layer(Extension(auth_state));

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .allowed_origin
                .parse::<HeaderValue>()
                .expect("invalid CORS origin"),
        )
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .merge(gateway)
        .layer(cors)
}

/// Retention sweep on a fixed interval, off the request path.
fn spawn_cleanup_task(services: Arc<services::AppServices>, config: &ApiConfig) {
    let interval = config.cleanup_interval;
    let retention_hours = config.retention_hours;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let services = services.clone();
            let swept =
                tokio::task::spawn_blocking(move || services.cleanup_old_jobs(retention_hours))
                    .await;

            match swept {
                Ok(Ok(removed)) if removed > 0 => {
                    tracing::info!(removed, "retention sweep removed old jobs");
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "retention sweep failed"),
                Err(e) => tracing::warn!(error = %e, "retention sweep task failed"),
            }
        }
    });
}
