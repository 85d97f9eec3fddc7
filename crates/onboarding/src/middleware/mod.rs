//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. CORS (front-end origin, credentials)
//! 3. `TraceLayer` (request spans)
//! 4. Request ID (add unique ID to each request)
//! 5. Session layer (tower-sessions with in-memory store)
//! 6. Rate limiting on `/api/auth` (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{OptionalSession, RequireSession, clear_auth_session, set_auth_session};
pub use rate_limit::{RateLimiterLayer, auth_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
