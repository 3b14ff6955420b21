//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! `AuthStore` is created once at application start and owns the one
//! authoritative `Session`. Route guards and user-aware views read
//! `AuthState` snapshots (directly or through `subscribe`); only the store's
//! own operations write the session or its cache entry.
//!
//! DESIGN
//! ======
//! State lives in a `watch::Sender<AuthState>`. Every transition is a single
//! `send_modify`, so a reader never sees the session and the pending set out
//! of step. `is_loading` and `activity` are derived from the pending set, which
//! RAII guards maintain even when an operation future is dropped mid-flight.
//!
//! Successful login/logout bump an epoch. A session check remembers the epoch
//! it started under and discards its answer if a mutation landed meanwhile, so
//! a slow `/api/me` response cannot undo a fresh login.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};

use super::cache::QueryCache;
use super::session::Session;
use crate::net::api::{ApiError, AuthApi};
use crate::net::types::{LoginRequest, User};

/// Cache key for the "who am I" query.
pub const SESSION_KEY: &str = "session";

// =============================================================================
// ERRORS
// =============================================================================

/// Input problems caught before any request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Password is required")]
    MissingPassword,
    #[error("Please complete the CAPTCHA challenge")]
    MissingCaptcha,
    #[error("Verification token is missing")]
    MissingToken,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Request(#[from] ApiError),
}

// =============================================================================
// STATE
// =============================================================================

/// What the store is currently busy with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Activity {
    #[default]
    Idle,
    CheckingSession,
    LoggingIn,
    LoggingOut,
}

/// Snapshot of the auth store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub session: Session,
    pending: Vec<(u64, Activity)>,
    epoch: u64,
}

impl AuthState {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session, pending: Vec::new(), epoch: 0 }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.session.user()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// True while any session check, login, or logout is unsettled.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The most recently started pending operation, or `Idle`.
    #[must_use]
    pub fn activity(&self) -> Activity {
        self.pending
            .last()
            .map_or(Activity::Idle, |(_, activity)| *activity)
    }

    #[must_use]
    pub fn is_pending(&self, activity: Activity) -> bool {
        self.pending.iter().any(|(_, op)| *op == activity)
    }

    #[cfg(test)]
    pub(crate) fn with_pending(mut self, activity: Activity) -> Self {
        let id = self.pending.len() as u64;
        self.pending.push((id, activity));
        self
    }
}

/// Marks one operation as pending for as long as it is alive.
struct Pending<'a> {
    state: &'a watch::Sender<AuthState>,
    id: u64,
    settled: bool,
}

impl Pending<'_> {
    /// Apply the operation's outcome and clear its pending mark in one step.
    fn finish<F>(mut self, apply: F)
    where
        F: FnOnce(&mut AuthState),
    {
        let id = self.id;
        self.state.send_modify(|state| {
            apply(state);
            state.pending.retain(|(op, _)| *op != id);
        });
        self.settled = true;
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let id = self.id;
        self.state
            .send_modify(|state| state.pending.retain(|(op, _)| *op != id));
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct AuthStore {
    api: Arc<dyn AuthApi>,
    cache: QueryCache<&'static str, Option<User>, ApiError>,
    state: watch::Sender<AuthState>,
    /// Serializes login/logout.
    mutation: Mutex<()>,
    next_op: AtomicU64,
}

impl AuthStore {
    /// Create a store whose cached session answer stays fresh for `stale_after`.
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, stale_after: Duration) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            api,
            cache: QueryCache::new(stale_after),
            state,
            mutation: Mutex::new(()),
            next_op: AtomicU64::new(0),
        }
    }

    /// The remote auth service this store talks to.
    #[must_use]
    pub fn api(&self) -> &Arc<dyn AuthApi> {
        &self.api
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receive every state transition from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.state.borrow().session.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    #[must_use]
    pub fn activity(&self) -> Activity {
        self.state.borrow().activity()
    }

    /// The cached answer to the session query, if one is settled.
    #[must_use]
    pub fn cached_session(&self) -> Option<Option<User>> {
        self.cache.peek(&SESSION_KEY)
    }

    /// Confirm the current session with the server, reusing a fresh cached
    /// answer or an in-flight request when there is one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Request`] if the check fails for any reason other
    /// than "not authenticated"; the session is left as it was.
    pub async fn check_session(&self) -> Result<Session, AuthError> {
        let pending = self.begin(Activity::CheckingSession);
        let epoch = self.state.borrow().epoch;

        let api = Arc::clone(&self.api);
        let result = self
            .cache
            .fetch(SESSION_KEY, move || async move { api.get_session().await })
            .await;

        match result {
            Ok(user) => {
                let mut session = Session::Unknown;
                pending.finish(|state| {
                    if state.epoch == epoch {
                        state.session = Session::from(user);
                    }
                    session = state.session.clone();
                });
                tracing::debug!(authenticated = session.is_authenticated(), "session checked");
                Ok(session)
            }
            Err(err) => {
                tracing::warn!(error = %err, "session check failed");
                pending.finish(|_| {});
                Err(AuthError::Request(err))
            }
        }
    }

    /// Drop the cached session answer and check again.
    ///
    /// # Errors
    ///
    /// Same as [`AuthStore::check_session`].
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        self.cache.mark_stale(&SESSION_KEY);
        self.check_session().await
    }

    /// Log in and make the returned user the current session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for a blank email or empty password
    /// (no request is sent), or [`AuthError::Request`] if the server rejects
    /// the credentials. The session is unchanged on error.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        captcha_token: Option<&str>,
    ) -> Result<User, AuthError> {
        let request = login_request(email, password, captcha_token)?;
        let pending = self.begin(Activity::LoggingIn);
        let _serial = self.mutation.lock().await;

        match self.api.login(&request).await {
            Ok(user) => {
                self.cache.set(SESSION_KEY, Some(user.clone()));
                let current = user.clone();
                pending.finish(move |state| {
                    state.session = Session::Present(current);
                    state.epoch = state.epoch.wrapping_add(1);
                });
                tracing::info!(user_id = %user.id, "login succeeded");
                Ok(user)
            }
            Err(err) => {
                tracing::info!(error = %err, "login failed");
                pending.finish(|_| {});
                Err(AuthError::Request(err))
            }
        }
    }

    /// Log out, forgetting the cached session answer entirely.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Request`] if the request fails; the session is
    /// unchanged on error.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let pending = self.begin(Activity::LoggingOut);
        let _serial = self.mutation.lock().await;

        match self.api.logout().await {
            Ok(()) => {
                self.cache.invalidate(&SESSION_KEY);
                pending.finish(|state| {
                    state.session = Session::Absent;
                    state.epoch = state.epoch.wrapping_add(1);
                });
                tracing::info!("logout succeeded");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "logout failed");
                pending.finish(|_| {});
                Err(AuthError::Request(err))
            }
        }
    }

    fn begin(&self, activity: Activity) -> Pending<'_> {
        let id = self.next_op.fetch_add(1, Ordering::Relaxed);
        self.state
            .send_modify(|state| state.pending.push((id, activity)));
        Pending { state: &self.state, id, settled: false }
    }
}

/// Structural checks only; password rules belong to the server.
fn login_request(
    email: &str,
    password: &str,
    captcha_token: Option<&str>,
) -> Result<LoginRequest, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if password.is_empty() {
        return Err(ValidationError::MissingPassword);
    }
    let turnstile_token = captcha_token
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned);
    Ok(LoginRequest { email: email.to_owned(), password: password.to_owned(), turnstile_token })
}
