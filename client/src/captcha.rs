//! CAPTCHA capability used by the login flow.
//!
//! SYSTEM CONTEXT
//! ==============
//! The interactive widget lives in the view layer. The core only needs the
//! solved token for the next login attempt and a way to discard it: tokens are
//! single-use, so a failed attempt must reset the challenge.

#[cfg(test)]
#[path = "captcha_test.rs"]
mod captcha_test;

use std::sync::Mutex;

#[async_trait::async_trait]
pub trait Captcha: Send + Sync {
    /// The solved token, or `None` if the challenge is not complete.
    async fn token(&self) -> Option<String>;

    /// Discard the current token and present a fresh challenge.
    fn reset(&self);
}

/// A pre-solved token supplied out of band (CLI flag, environment).
#[derive(Default)]
pub struct StaticCaptcha {
    token: Mutex<Option<String>>,
}

impl StaticCaptcha {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        Self { token: Mutex::new(token) }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for StaticCaptcha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCaptcha")
            .field("solved", &self.slot().is_some())
            .finish()
    }
}

#[async_trait::async_trait]
impl Captcha for StaticCaptcha {
    async fn token(&self) -> Option<String> {
        self.slot().clone()
    }

    fn reset(&self) {
        *self.slot() = None;
    }
}
