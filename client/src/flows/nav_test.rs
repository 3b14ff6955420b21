use super::*;
use crate::state::auth::Activity;
use crate::test_helpers::sample_user;

#[test]
fn greeting_uses_display_name() {
    let state = AuthState::new(Session::Present(sample_user("a@b.com")));
    assert_eq!(header_greeting(&state).as_deref(), Some("Welcome, Ada Lovelace"));
}

#[test]
fn greeting_falls_back_to_first_name() {
    let mut user = sample_user("a@b.com");
    user.display_name = String::new();
    let state = AuthState::new(Session::Present(user));
    assert_eq!(header_greeting(&state).as_deref(), Some("Welcome, Ada"));
}

#[test]
fn no_greeting_without_user() {
    assert_eq!(header_greeting(&AuthState::new(Session::Absent)), None);
    assert_eq!(header_greeting(&AuthState::default()), None);
}

#[test]
fn redirects_when_settled_and_absent() {
    let state = AuthState::new(Session::Absent);
    assert_eq!(unauthenticated_redirect(&state), Some(LOGIN));
}

#[test]
fn no_redirect_while_loading() {
    let state = AuthState::new(Session::Absent).with_pending(Activity::CheckingSession);
    assert_eq!(unauthenticated_redirect(&state), None);
}

#[test]
fn no_redirect_before_first_check() {
    assert_eq!(unauthenticated_redirect(&AuthState::default()), None);
}

#[test]
fn no_redirect_when_user_exists() {
    let state = AuthState::new(Session::Present(sample_user("a@b.com")));
    assert_eq!(unauthenticated_redirect(&state), None);
}

#[test]
fn verify_email_token_from_path() {
    assert_eq!(verify_email_token("/verify-email/abc123"), Some("abc123"));
    assert_eq!(verify_email_token("/verify-email/abc123/"), Some("abc123"));
    assert_eq!(verify_email_token("/verify-email/"), None);
    assert_eq!(verify_email_token("/login"), None);
}
