//! Shared wire DTOs for the client/server boundary.
//!
//! DESIGN
//! ======
//! These types mirror the eMuse REST payloads. Request types that carry a
//! password or CAPTCHA token implement `Debug` by hand so credentials never
//! reach a log line.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// An account as returned by `/api/me` and `/api/login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique account identifier.
    pub id: Uuid,
    /// When the account was created.
    #[serde(with = "time::serde::rfc3339")]
    pub signup_at: OffsetDateTime,
    /// Most recent successful login, if any.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_login_at: Option<OffsetDateTime>,
    pub first_name: String,
    pub surname: String,
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub date_of_birth: Option<Date>,
    /// Locale in `xx_YY` form (e.g. `"en_US"`).
    pub locale: String,
    /// IANA timezone name.
    pub timezone: String,
    /// Email address has been verified.
    pub activated: bool,
    pub locked: bool,
    pub memorial: bool,
    pub administrator: bool,
}

impl User {
    /// Name shown in the header greeting: display name, else first name.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.first_name
        } else {
            &self.display_name
        }
    }
}

/// Body of `POST /api/login`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turnstile_token: Option<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &"<redacted>")
            .field("password", &"<redacted>")
            .field("turnstile_token", &self.turnstile_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Body of `POST /api/signup`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub surname: String,
    pub display_name: String,
    /// Serialized as `YYYY-MM-DD`.
    pub date_of_birth: Date,
    pub locale: String,
    pub timezone: String,
}

impl std::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &"<redacted>")
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("surname", &self.surname)
            .field("display_name", &self.display_name)
            .field("date_of_birth", &self.date_of_birth)
            .field("locale", &self.locale)
            .field("timezone", &self.timezone)
            .finish()
    }
}

/// Confirmation returned by `POST /api/signup`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupResponse {
    pub message: String,
    pub email: String,
}

/// Result of `GET /api/verify-email/{token}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyEmailResponse {
    pub success: bool,
    pub message: String,
}

/// Public Turnstile configuration from `GET /api/turnstile/config`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnstileConfig {
    pub site_key: String,
}

/// Error body shape used by the server for rejected requests.
///
/// `detail` is usually a string but validation failures send a list, so it
/// stays untyped here.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: serde_json::Value,
}
