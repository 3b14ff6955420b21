//! Email verification page controller.

#[cfg(test)]
#[path = "verify_email_test.rs"]
mod verify_email_test;

use super::nav;
use crate::net::api::AuthApi;
use crate::state::auth::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified { message: String },
    Failed { message: String },
}

impl VerifyOutcome {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Verified { message } | Self::Failed { message } => message,
        }
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    /// Verified users go on to log in; everyone else goes home.
    #[must_use]
    pub fn next_route(&self) -> &'static str {
        if self.is_verified() { nav::LOGIN } else { nav::HOME }
    }
}

/// Redeem a verification token.
///
/// Never fails: every problem becomes a [`VerifyOutcome::Failed`] whose
/// message is ready to show.
pub async fn verify(api: &dyn AuthApi, token: &str) -> VerifyOutcome {
    let token = token.trim();
    if token.is_empty() {
        return VerifyOutcome::Failed { message: ValidationError::MissingToken.to_string() };
    }

    match api.verify_email(token).await {
        Ok(response) if response.success => {
            tracing::info!("email verified");
            VerifyOutcome::Verified { message: response.message }
        }
        Ok(response) => VerifyOutcome::Failed { message: response.message },
        Err(err) => {
            tracing::info!(status = ?err.status(), "email verification rejected");
            VerifyOutcome::Failed { message: err.to_string() }
        }
    }
}
