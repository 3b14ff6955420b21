//! Tri-state session value.
//!
//! A plain `Option<User>` cannot tell "not checked yet" apart from "checked,
//! nobody logged in"; route guards need that difference to avoid redirecting
//! while the first check is still running.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use crate::net::types::User;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Session {
    /// No check has completed yet.
    #[default]
    Unknown,
    /// The server confirmed nobody is authenticated.
    Absent,
    /// The server confirmed this user is authenticated.
    Present(User),
}

impl Session {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Present(user) => Some(user),
            Self::Unknown | Self::Absent => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Whether a server answer has been recorded.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl From<Option<User>> for Session {
    fn from(user: Option<User>) -> Self {
        user.map_or(Self::Absent, Self::Present)
    }
}
