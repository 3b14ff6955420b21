//! REST API client for the eMuse auth endpoints.
//!
//! `AuthApi` is the seam the auth store depends on; `HttpAuthApi` is the
//! reqwest implementation. Every request shares one cookie jar so the session
//! cookie set by `/api/login` rides along on later calls.
//!
//! ERROR HANDLING
//! ==============
//! Session checks treat 401 as "not authenticated" rather than an error.
//! Login/logout/session failures surface a fixed message; signup and email
//! verification forward the server's `detail` string when one is present.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::Arc;

use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use serde::de::DeserializeOwned;

use super::types::{
    ErrorBody, LoginRequest, SignupRequest, SignupResponse, TurnstileConfig, User, VerifyEmailResponse,
};
use crate::config::ClientConfig;

/// Name of the session cookie issued by the server.
pub const SESSION_COOKIE_NAME: &str = "cookie";

const SESSION_CHECK_FAILED: &str = "Failed to check session";
const LOGIN_FAILED: &str = "Login failed";
const LOGOUT_FAILED: &str = "Logout failed";
const SIGNUP_FAILED: &str = "Signup failed";
const VERIFICATION_FAILED: &str = "Verification failed";
const TURNSTILE_CONFIG_FAILED: &str = "Failed to load CAPTCHA configuration";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by auth API calls.
///
/// `Clone` so a single deduplicated fetch can hand the same error to every
/// waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connect, TLS, timeout).
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// A success body did not match the expected shape.
    #[error("response parse failed: {0}")]
    Decode(String),

    #[error("invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// HTTP status for server rejections.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Remote auth service contract. Enables stubbing in tests.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// `GET /api/me`. `Ok(None)` when the server answers 401.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] for transport failures and non-401 rejections.
    async fn get_session(&self) -> Result<Option<User>, ApiError>;

    /// `POST /api/login`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the credentials are rejected or the request fails.
    async fn login(&self, request: &LoginRequest) -> Result<User, ApiError>;

    /// `GET /api/logout`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or is rejected.
    async fn logout(&self) -> Result<(), ApiError>;

    /// `POST /api/signup`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] carrying the server's `detail` on rejection.
    async fn signup(&self, request: &SignupRequest) -> Result<SignupResponse, ApiError>;

    /// `GET /api/verify-email/{token}`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] carrying the server's `detail` on rejection.
    async fn verify_email(&self, token: &str) -> Result<VerifyEmailResponse, ApiError>;

    /// `GET /api/turnstile/config`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or is rejected.
    async fn turnstile_config(&self) -> Result<TurnstileConfig, ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: Url,
    cookies: Arc<Jar>,
}

impl HttpAuthApi {
    /// Build a client for `config.base_url`, seeding the cookie jar with
    /// `config.session_cookie` when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = parse_base_url(&config.base_url)?;

        let cookies = Arc::new(Jar::default());
        if let Some(value) = &config.session_cookie {
            cookies.add_cookie_str(&format!("{SESSION_COOKIE_NAME}={value}; Path=/"), &base_url);
        }

        let mut builder = reqwest::Client::builder().cookie_provider(Arc::clone(&cookies));
        if let Some(timeout) = config.timeouts.request {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.timeouts.connect {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;

        Ok(Self { http, base_url, cookies })
    }

    /// Current value of the session cookie, if the jar holds one.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        let header = self.cookies.cookies(&self.base_url)?;
        let header = header.to_str().ok()?;
        session_cookie_value(header)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        endpoint(&self.base_url, segments)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "auth request failed");
            ApiError::Transport(e.to_string())
        })
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn get_session(&self) -> Result<Option<User>, ApiError> {
        let response = self.send(self.http.get(self.url(&["api", "me"])?)).await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "session check rejected");
            return Err(rejected(status.as_u16(), SESSION_CHECK_FAILED));
        }
        decode::<User>(response).await.map(Some)
    }

    async fn login(&self, request: &LoginRequest) -> Result<User, ApiError> {
        let response = self
            .send(self.http.post(self.url(&["api", "login"])?).json(request))
            .await?;
        let status = response.status();
        if !status.is_success() {
            tracing::info!(status = status.as_u16(), "login rejected");
            return Err(rejected(status.as_u16(), LOGIN_FAILED));
        }
        decode(response).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let response = self.send(self.http.get(self.url(&["api", "logout"])?)).await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "logout rejected");
            return Err(rejected(status.as_u16(), LOGOUT_FAILED));
        }
        Ok(())
    }

    async fn signup(&self, request: &SignupRequest) -> Result<SignupResponse, ApiError> {
        let response = self
            .send(self.http.post(self.url(&["api", "signup"])?).json(request))
            .await?;
        if !response.status().is_success() {
            return Err(rejected_with_detail(response, SIGNUP_FAILED).await);
        }
        decode(response).await
    }

    async fn verify_email(&self, token: &str) -> Result<VerifyEmailResponse, ApiError> {
        let response = self
            .send(self.http.get(self.url(&["api", "verify-email", token])?))
            .await?;
        if !response.status().is_success() {
            return Err(rejected_with_detail(response, VERIFICATION_FAILED).await);
        }
        decode(response).await
    }

    async fn turnstile_config(&self) -> Result<TurnstileConfig, ApiError> {
        let response = self
            .send(self.http.get(self.url(&["api", "turnstile", "config"])?))
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(rejected(status.as_u16(), TURNSTILE_CONFIG_FAILED));
        }
        decode(response).await
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl(raw.to_owned()));
    }
    Ok(url)
}

/// Append percent-encoded path segments to the base URL.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ApiError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn rejected(status: u16, message: &str) -> ApiError {
    ApiError::Rejected { status, message: message.to_owned() }
}

async fn rejected_with_detail(response: reqwest::Response, fallback: &str) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::info!(status, "request rejected");
    ApiError::Rejected { status, message: rejection_message(&body, fallback) }
}

/// Pull a string `detail` out of an error body, else use `fallback`.
fn rejection_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail.as_str().map(str::trim).map(ToOwned::to_owned))
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Find the session cookie in a `Cookie` header value.
fn session_cookie_value(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.to_owned())
        .filter(|value| !value.is_empty())
}
