use super::*;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::captcha::StaticCaptcha;
use crate::test_helpers::{StubApi, rejected, sample_user};

/// Always solved; counts resets.
#[derive(Default)]
struct MockCaptcha {
    resets: AtomicUsize,
}

#[async_trait::async_trait]
impl Captcha for MockCaptcha {
    async fn token(&self) -> Option<String> {
        Some("tok".to_owned())
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

fn store_with(api: &Arc<StubApi>) -> AuthStore {
    AuthStore::new(api.clone(), Duration::from_secs(300))
}

#[test]
fn check_requires_email_then_password() {
    assert_eq!(LoginForm::new("", "").check(), Err(ValidationError::MissingEmail));
    assert_eq!(LoginForm::new("a@b.com", "").check(), Err(ValidationError::MissingPassword));
    assert_eq!(LoginForm::new("a@b.com", "pw123456").check(), Ok(()));
}

#[test]
fn debug_hides_credentials() {
    let rendered = format!("{:?}", LoginForm::new("a@b.com", "hunter22"));
    assert!(!rendered.contains("a@b.com"));
    assert!(!rendered.contains("hunter22"));
}

#[tokio::test]
async fn submit_logs_in_with_captcha_token() {
    let api = Arc::new(StubApi::new());
    api.set_login(Ok(sample_user("a@b.com")));
    let store = store_with(&api);
    let captcha = MockCaptcha::default();

    let user = LoginForm::new("a@b.com", "pw123456")
        .submit(&store, &captcha)
        .await
        .unwrap();
    assert_eq!(user.email, "a@b.com");
    assert!(store.is_authenticated());
    let sent = api.last_login.lock().unwrap().clone().unwrap();
    assert_eq!(sent.turnstile_token.as_deref(), Some("tok"));
    assert_eq!(captcha.resets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unsolved_captcha_blocks_request() {
    let api = Arc::new(StubApi::new());
    let store = store_with(&api);

    let err = LoginForm::new("a@b.com", "pw123456")
        .submit(&store, &StaticCaptcha::default())
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::Validation(ValidationError::MissingCaptcha));
    assert_eq!(err.to_string(), "Please complete the CAPTCHA challenge");
    assert_eq!(api.login_calls(), 0);
}

#[tokio::test]
async fn missing_email_blocks_request() {
    let api = Arc::new(StubApi::new());
    let store = store_with(&api);

    let err = LoginForm::new(" ", "pw123456")
        .submit(&store, &MockCaptcha::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Email is required");
    assert_eq!(api.login_calls(), 0);
}

#[tokio::test]
async fn failed_login_resets_captcha() {
    let api = Arc::new(StubApi::new());
    let store = store_with(&api);
    let captcha = MockCaptcha::default();

    let err = LoginForm::new("a@b.com", "wrong-password")
        .submit(&store, &captcha)
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::Request(rejected(401, "Login failed")));
    assert!(!store.is_authenticated());
    assert_eq!(captcha.resets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn static_captcha_is_spent_after_failure() {
    let api = Arc::new(StubApi::new());
    let store = store_with(&api);
    let captcha = StaticCaptcha::new(Some("tok".to_owned()));
    let form = LoginForm::new("a@b.com", "wrong-password");

    form.submit(&store, &captcha).await.unwrap_err();
    let err = form.submit(&store, &captcha).await.unwrap_err();
    assert_eq!(err, AuthError::Validation(ValidationError::MissingCaptcha));
    assert_eq!(api.login_calls(), 1);
}
