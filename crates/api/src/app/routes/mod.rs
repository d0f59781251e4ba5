use axum::{routing::get, Router};

pub mod bookings;
pub mod cars;
pub mod common;
pub mod system;
pub mod users;

/// Router for endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/", get(system::liveness))
        .merge(cars::public_router())
        .merge(users::public_router())
}

/// Router for endpoints behind the access guard.
pub fn protected_router() -> Router {
    Router::new()
        .merge(cars::protected_router())
        .merge(bookings::protected_router())
        .merge(users::protected_router())
}
