//! Shared fixtures for unit tests: a sample user and a scriptable `AuthApi`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use time::macros::datetime;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::net::api::{ApiError, AuthApi};
use crate::net::types::{
    LoginRequest, SignupRequest, SignupResponse, TurnstileConfig, User, VerifyEmailResponse,
};

#[must_use]
pub fn sample_user(email: &str) -> User {
    User {
        id: Uuid::from_u128(1),
        signup_at: datetime!(2025-01-01 00:00:00 UTC),
        last_login_at: None,
        first_name: "Ada".to_owned(),
        surname: "Lovelace".to_owned(),
        display_name: "Ada Lovelace".to_owned(),
        email: email.to_owned(),
        date_of_birth: None,
        locale: "en_US".to_owned(),
        timezone: "UTC".to_owned(),
        activated: true,
        locked: false,
        memorial: false,
        administrator: false,
    }
}

#[must_use]
pub fn rejected(status: u16, message: &str) -> ApiError {
    ApiError::Rejected { status, message: message.to_owned() }
}

/// Scriptable `AuthApi` that counts calls and can hold requests in flight.
pub struct StubApi {
    pub session: Mutex<Result<Option<User>, ApiError>>,
    pub login: Mutex<Result<User, ApiError>>,
    pub logout: Mutex<Result<(), ApiError>>,
    pub signup: Mutex<Result<SignupResponse, ApiError>>,
    pub verify: Mutex<Result<VerifyEmailResponse, ApiError>>,
    pub session_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub signup_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub last_login: Mutex<Option<LoginRequest>>,
    pub last_signup: Mutex<Option<SignupRequest>>,
    pub session_gate: Mutex<Option<Arc<Notify>>>,
    pub login_gate: Mutex<Option<Arc<Notify>>>,
    pub logout_gate: Mutex<Option<Arc<Notify>>>,
}

impl StubApi {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session: Mutex::new(Ok(None)),
            login: Mutex::new(Err(rejected(401, "Login failed"))),
            logout: Mutex::new(Ok(())),
            signup: Mutex::new(Ok(SignupResponse {
                message: "Account created successfully.".to_owned(),
                email: "a@b.com".to_owned(),
            })),
            verify: Mutex::new(Ok(VerifyEmailResponse {
                success: true,
                message: "Email verified successfully! You can now log in.".to_owned(),
            })),
            session_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            signup_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            last_login: Mutex::new(None),
            last_signup: Mutex::new(None),
            session_gate: Mutex::new(None),
            login_gate: Mutex::new(None),
            logout_gate: Mutex::new(None),
        }
    }

    pub fn set_session(&self, result: Result<Option<User>, ApiError>) {
        *self.session.lock().unwrap() = result;
    }

    pub fn set_login(&self, result: Result<User, ApiError>) {
        *self.login.lock().unwrap() = result;
    }

    pub fn set_logout(&self, result: Result<(), ApiError>) {
        *self.logout.lock().unwrap() = result;
    }

    /// Hold every `get_session` call until the returned gate is notified.
    pub fn gate_session(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.session_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn gate_login(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.login_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn gate_logout(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.logout_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

impl Default for StubApi {
    fn default() -> Self {
        Self::new()
    }
}

async fn pass_gate(gate: &Mutex<Option<Arc<Notify>>>) {
    let gate = gate.lock().unwrap().clone();
    if let Some(gate) = gate {
        gate.notified().await;
    }
}

#[async_trait::async_trait]
impl AuthApi for StubApi {
    async fn get_session(&self) -> Result<Option<User>, ApiError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        pass_gate(&self.session_gate).await;
        self.session.lock().unwrap().clone()
    }

    async fn login(&self, request: &LoginRequest) -> Result<User, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_login.lock().unwrap() = Some(request.clone());
        pass_gate(&self.login_gate).await;
        self.login.lock().unwrap().clone()
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        pass_gate(&self.logout_gate).await;
        self.logout.lock().unwrap().clone()
    }

    async fn signup(&self, request: &SignupRequest) -> Result<SignupResponse, ApiError> {
        self.signup_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_signup.lock().unwrap() = Some(request.clone());
        self.signup.lock().unwrap().clone()
    }

    async fn verify_email(&self, _token: &str) -> Result<VerifyEmailResponse, ApiError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verify.lock().unwrap().clone()
    }

    async fn turnstile_config(&self) -> Result<TurnstileConfig, ApiError> {
        Ok(TurnstileConfig { site_key: "test-site-key".to_owned() })
    }
}

/// Yield to the scheduler until `condition` holds.
///
/// # Panics
///
/// Panics if the condition is still false after many yields.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
