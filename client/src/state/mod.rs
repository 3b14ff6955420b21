//! Client-side application state.
//!
//! SYSTEM CONTEXT
//! ==============
//! `auth` owns the current session and is the only writer of the session
//! cache entry; `cache` is the generic keyed query cache behind it.

pub mod auth;
pub mod cache;
pub mod session;
