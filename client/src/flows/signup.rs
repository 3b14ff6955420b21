//! Signup form controller.
//!
//! Field rules mirror the signup page: every violation is collected so the
//! form can show all messages at once, and nothing is posted while any remain.
//! The age rule compares calendar years only.

#[cfg(test)]
#[path = "signup_test.rs"]
mod signup_test;

use time::Date;
use time::macros::format_description;

use crate::net::api::{ApiError, AuthApi};
use crate::net::types::{SignupRequest, SignupResponse};

pub const DEFAULT_LOCALE: &str = "en_US";
pub const DEFAULT_TIMEZONE: &str = "UTC";

const MIN_PASSWORD_CHARS: usize = 8;
const MIN_AGE_YEARS: i32 = 13;

/// Per-field validation messages; `None` means the field is fine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupErrors {
    pub email: Option<&'static str>,
    pub password: Option<&'static str>,
    pub confirm_password: Option<&'static str>,
    pub first_name: Option<&'static str>,
    pub surname: Option<&'static str>,
    pub display_name: Option<&'static str>,
    pub date_of_birth: Option<&'static str>,
}

impl SignupErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    /// `(field, message)` pairs in form order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        [
            ("email", self.email),
            ("password", self.password),
            ("confirm_password", self.confirm_password),
            ("first_name", self.first_name),
            ("surname", self.surname),
            ("display_name", self.display_name),
            ("date_of_birth", self.date_of_birth),
        ]
        .into_iter()
        .filter_map(|(field, message)| message.map(|m| (field, m)))
    }
}

impl std::fmt::Display for SignupErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (field, message)) in self.fields().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignupError {
    #[error("{0}")]
    Invalid(SignupErrors),
    #[error(transparent)]
    Request(#[from] ApiError),
}

#[derive(Clone, Default)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub surname: String,
    /// Left empty, it becomes `"{first_name} {surname}"`.
    pub display_name: String,
    /// `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub locale: String,
    pub timezone: String,
}

impl std::fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupForm")
            .field("email", &"<redacted>")
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("surname", &self.surname)
            .field("display_name", &self.display_name)
            .field("locale", &self.locale)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

impl SignupForm {
    /// The display name that will be sent.
    #[must_use]
    pub fn effective_display_name(&self) -> String {
        let display = self.display_name.trim();
        let first = self.first_name.trim();
        let surname = self.surname.trim();
        if display.is_empty() && !first.is_empty() && !surname.is_empty() {
            format!("{first} {surname}")
        } else {
            display.to_owned()
        }
    }

    /// Apply every field rule, producing the request body when all pass.
    ///
    /// # Errors
    ///
    /// Returns the collected messages for every failing field.
    pub fn validate(&self, today: Date) -> Result<SignupRequest, SignupErrors> {
        let email = self.email.trim();
        let display_name = self.effective_display_name();
        let date_of_birth = parse_date_of_birth(&self.date_of_birth);

        let errors = SignupErrors {
            email: email_error(email),
            password: password_error(&self.password),
            confirm_password: confirm_error(&self.password, &self.confirm_password),
            first_name: self
                .first_name
                .trim()
                .is_empty()
                .then_some("First name is required"),
            surname: self.surname.trim().is_empty().then_some("Surname is required"),
            display_name: display_name.is_empty().then_some("Display name is required"),
            date_of_birth: date_of_birth
                .and_then(|dob| age_error(dob, today))
                .err(),
        };
        if !errors.is_empty() {
            return Err(errors);
        }
        let Ok(date_of_birth) = date_of_birth else {
            return Err(errors);
        };

        Ok(SignupRequest {
            email: email.to_owned(),
            password: self.password.clone(),
            first_name: self.first_name.trim().to_owned(),
            surname: self.surname.trim().to_owned(),
            display_name,
            date_of_birth,
            locale: or_default(&self.locale, DEFAULT_LOCALE),
            timezone: or_default(&self.timezone, DEFAULT_TIMEZONE),
        })
    }

    /// Validate, then post to `/api/signup`.
    ///
    /// # Errors
    ///
    /// Returns [`SignupError::Invalid`] without sending anything when a rule
    /// fails, or [`SignupError::Request`] carrying the server's message.
    pub async fn submit(&self, api: &dyn AuthApi, today: Date) -> Result<SignupResponse, SignupError> {
        let request = self.validate(today).map_err(SignupError::Invalid)?;
        match api.signup(&request).await {
            Ok(response) => {
                tracing::info!("signup accepted");
                Ok(response)
            }
            Err(err) => {
                tracing::info!(status = ?err.status(), error = %err, "signup rejected");
                Err(SignupError::Request(err))
            }
        }
    }
}

/// Turn a BCP 47 language tag into the server's locale form (`en-US` → `en_US`).
#[must_use]
pub fn locale_from_language_tag(tag: Option<&str>) -> String {
    match tag.map(str::trim) {
        Some(tag) if !tag.is_empty() => tag.replacen('-', "_", 1),
        _ => DEFAULT_LOCALE.to_owned(),
    }
}

/// `local@domain.tld` shape: one `@`, no whitespace, a dot inside the domain.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

fn email_error(email: &str) -> Option<&'static str> {
    if email.is_empty() {
        Some("Email is required")
    } else if !is_valid_email(email) {
        Some("Please enter a valid email address")
    } else {
        None
    }
}

fn password_error(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        Some("Password is required")
    } else if password.chars().count() < MIN_PASSWORD_CHARS {
        Some("Password must be at least 8 characters")
    } else {
        None
    }
}

fn confirm_error(password: &str, confirm: &str) -> Option<&'static str> {
    if confirm.is_empty() {
        Some("Please confirm your password")
    } else if password != confirm {
        Some("Passwords do not match")
    } else {
        None
    }
}

fn parse_date_of_birth(raw: &str) -> Result<Date, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("Date of birth is required");
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| "Date of birth must be a valid date (YYYY-MM-DD)")
}

fn age_error(date_of_birth: Date, today: Date) -> Result<Date, &'static str> {
    if today.year() - date_of_birth.year() < MIN_AGE_YEARS {
        return Err("You must be at least 13 years old to sign up");
    }
    Ok(date_of_birth)
}

fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    let chosen = if value.is_empty() { default } else { value };
    chosen.to_owned()
}
