//! eMuse client library.
//!
//! ARCHITECTURE
//! ============
//! `state::auth::AuthStore` is the single owner of "who is logged in". It
//! talks to the server through the `net::api::AuthApi` seam and keeps a
//! deduplicating `state::cache::QueryCache` in step with every mutation.
//! `flows` holds the form and page controllers that a view layer (or the CLI)
//! drives.

pub mod captcha;
pub mod config;
pub mod flows;
pub mod net;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::ClientConfig;
pub use net::api::{ApiError, AuthApi, HttpAuthApi};
pub use net::types::User;
pub use state::auth::{Activity, AuthError, AuthState, AuthStore, ValidationError};
pub use state::session::Session;
