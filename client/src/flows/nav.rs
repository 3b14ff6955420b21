//! Route names and auth-aware navigation helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route guards and the header read the same `AuthState`, so redirect and
//! greeting rules live here instead of in each page.

#[cfg(test)]
#[path = "nav_test.rs"]
mod nav_test;

use crate::state::auth::AuthState;
use crate::state::session::Session;

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";
pub const SIGNUP: &str = "/signup";
pub const SIGNUP_SUCCESS: &str = "/signup/success";
pub const VERIFY_EMAIL_PREFIX: &str = "/verify-email/";

/// Route after a logout completes.
pub const AFTER_LOGOUT: &str = HOME;

/// `Welcome, <name>` for the header, when someone is logged in.
#[must_use]
pub fn header_greeting(state: &AuthState) -> Option<String> {
    state
        .user()
        .map(|user| format!("Welcome, {}", user.greeting_name()))
}

/// Where a protected page should send the visitor, if anywhere.
///
/// Only redirects once a check has settled with no user; an `Unknown`
/// session or any pending operation means the answer is not in yet.
#[must_use]
pub fn unauthenticated_redirect(state: &AuthState) -> Option<&'static str> {
    if state.is_loading() {
        return None;
    }
    match state.session {
        Session::Absent => Some(LOGIN),
        Session::Unknown | Session::Present(_) => None,
    }
}

/// Extract the token from a `/verify-email/{token}` path.
#[must_use]
pub fn verify_email_token(path: &str) -> Option<&str> {
    path.strip_prefix(VERIFY_EMAIL_PREFIX)
        .map(|rest| rest.trim_end_matches('/'))
        .filter(|token| !token.is_empty() && !token.contains('/'))
}
