//! Login form controller.
//!
//! Checks run in page order (email, password, CAPTCHA) and stop at the first
//! failure without contacting the server. A failed attempt burns the CAPTCHA
//! token, so the challenge is reset before the error is returned.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use crate::captcha::Captcha;
use crate::net::types::User;
use crate::state::auth::{AuthError, AuthStore, ValidationError};

#[derive(Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

impl LoginForm {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }

    /// Field checks that do not need the CAPTCHA.
    ///
    /// # Errors
    ///
    /// Returns the first missing field.
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingEmail);
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingPassword);
        }
        Ok(())
    }

    /// Validate, collect the CAPTCHA token, and log in through the store.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for a missing field or unsolved
    /// CAPTCHA, or whatever [`AuthStore::login`] returns.
    pub async fn submit(&self, store: &AuthStore, captcha: &dyn Captcha) -> Result<User, AuthError> {
        self.check()?;
        let Some(token) = captcha.token().await else {
            return Err(ValidationError::MissingCaptcha.into());
        };

        let result = store.login(&self.email, &self.password, Some(&token)).await;
        if result.is_err() {
            captcha.reset();
        }
        result
    }
}
