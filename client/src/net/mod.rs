//! Networking modules for the eMuse REST API.
//!
//! `api` holds the auth service contract and its HTTP client; `types` defines
//! the shared wire schema.

pub mod api;
pub mod types;
