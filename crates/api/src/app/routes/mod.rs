use axum::{routing::post, Router};

pub mod advertisements;
pub mod login;
pub mod system;
pub mod users;

/// Endpoints that never reject a request for carrying a stale credential.
pub fn public_router() -> Router {
    Router::new()
        .route("/login", post(login::login))
        .route("/user", post(users::create_user))
}

/// Router for every endpoint behind the caller-resolution middleware.
pub fn router() -> Router {
    Router::new()
        .merge(users::router())
        .nest("/advertisement", advertisements::router())
}
