//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (Supabase reachable)
//!
//! # Auth API (JSON, rate limited)
//! POST /api/auth/signup        - Create account, email a code if confirmation is on
//! POST /api/auth/signin        - Password sign-in
//! POST /api/auth/verify        - Check a six-digit code and confirm the email
//! POST /api/auth/resend        - Email a fresh code
//! GET  /api/auth/session       - Restore the signed-in session
//! POST /api/auth/signout       - Sign out
//! ```

pub mod auth;
pub mod health;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_rate_limiter, create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the auth API router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::sign_up))
        .route("/signin", post(auth::sign_in))
        .route("/verify", post(auth::verify))
        .route("/resend", post(auth::resend))
        .route("/session", get(auth::session))
        .route("/signout", post(auth::sign_out))
}

/// Create all routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest(
            "/api/auth",
            auth_routes().layer(auth_rate_limiter(&state.config().rate_limit)),
        )
}

/// Build the complete application with its middleware stack.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// rate limiter can fall back to the peer address.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());
    let cors = cors_layer(&state.config().base_url);

    routes(&state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(from_fn(request_id_middleware))
                .layer(session_layer),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the front-end origin, with cookies.
fn cors_layer(base_url: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = HeaderValue::from_str(base_url).into_iter().collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
