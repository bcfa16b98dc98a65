//! Main [axum::Router] interface for webserver.

use crate::{
    app_state::AppState,
    routes::{
        attendances, auth, employees, fallback::notfound_404, health, identities, offices, ping,
    },
    setups::ServerSetup,
};
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Setup main router for application.
pub fn setup_app_router<S: ServerSetup>(app_state: AppState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([
            http::header::AUTHORIZATION,
            http::header::CONTENT_TYPE,
            http::header::ACCEPT,
        ])
        // allow requests from any origin
        .allow_origin(Any);

    let api_router = Router::new()
        .route("/offices", post(offices::register::<S>))
        .route(
            "/offices/:id",
            get(offices::get::<S>).patch(offices::patch::<S>),
        )
        .route("/offices/:id/counts", get(offices::daily_counts::<S>))
        .route("/offices/:id/attendances", get(offices::attendances::<S>))
        .route("/employees", post(employees::create::<S>))
        .route("/employees/invite", post(employees::invite::<S>))
        .route(
            "/employees/:identity_id/reinvite",
            post(employees::reinvite::<S>),
        )
        .route("/auth/otp/verify", post(auth::verify_otp::<S>))
        .route("/auth/login", post(auth::login::<S>))
        .route("/auth/refresh", post(auth::refresh::<S>))
        .route("/auth/revoke", post(auth::revoke::<S>))
        .route("/auth/password", put(auth::set_password::<S>))
        .route("/attendances/check-in", post(attendances::check_in::<S>))
        .route(
            "/attendances/:id/check-out",
            post(attendances::check_out::<S>),
        )
        .route("/attendances/:id", patch(attendances::correct::<S>))
        .route("/identities/:id", delete(identities::delete::<S>))
        .layer(cors);

    Router::new()
        .route("/ping", get(ping::get))
        .route("/healthcheck", get(health::healthcheck::<S>))
        .nest("/api/v0", api_router)
        .fallback(notfound_404)
        .with_state(app_state)
}
