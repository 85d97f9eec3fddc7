//! Session-stored and API-facing models.

pub mod session;

pub use session::{UserSummary, keys};
