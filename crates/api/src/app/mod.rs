//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage backend and auth facade wiring
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and input validation
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        services: services.clone(),
    };

    // Login and registration resolve credentials themselves (registration
    // only when it asks for the admin group).
    let public = routes::public_router().layer(Extension(services.clone()));

    // Every other resource route resolves the caller first; the policy
    // decides per handler whether an anonymous caller is enough.
    let resources = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/", get(routes::system::root))
        .route("/health", get(routes::system::health))
        .merge(public)
        .merge(resources)
        .layer(ServiceBuilder::new())
}
