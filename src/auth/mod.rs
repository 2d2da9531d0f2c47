//! Authentication helpers and token providers.
//!
//! The managed backend authenticates with short-lived bearer tokens for the
//! Cognitive Services scope. Two flows are provided:
//! - [`managed_identity::ManagedIdentityCredential`] (platform identity)
//! - [`client_secret::ClientSecretCredential`] (app registration)
//!
//! Both cache their token in memory and refresh it shortly before expiry.

pub mod client_secret;
pub mod credential;
pub mod managed_identity;

pub use client_secret::ClientSecretCredential;
pub use credential::CredentialFlow;
pub use managed_identity::ManagedIdentityCredential;

use crate::error::{EndpointError, Result};
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::future::Future;
use tokio::sync::Mutex;

/// Scope requested by both flows.
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";
/// Refresh this long before a cached token expires.
pub const EXPIRY_SAFETY_WINDOW_SECS: i64 = 300;
/// Upper bound on one token acquisition, including the default identity client.
pub const TOKEN_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// HTTP client used by the credential flows when the caller supplies none.
pub fn default_identity_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(TOKEN_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| EndpointError::ConfigurationError(format!("identity HTTP client: {e}")))
}

/// A bearer token and its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    token: SecretString,
    expires_on: DateTime<Utc>,
}

impl AccessToken {
    /// Create a token expiring at `expires_on`.
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            expires_on,
        }
    }

    /// The raw bearer value.
    pub fn secret(&self) -> &str {
        self.token.expose_secret()
    }

    /// Absolute expiry.
    pub fn expires_on(&self) -> DateTime<Utc> {
        self.expires_on
    }

    /// True when the token expires within `window` from now. An expiry too
    /// early to subtract `window` from counts as expired.
    pub fn expires_within(&self, window: Duration) -> bool {
        self.expires_on
            .checked_sub_signed(window)
            .is_none_or(|at| at <= Utc::now())
    }
}

/// An asynchronous bearer token source.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token suitable for the `Authorization: Bearer <token>` header.
    async fn token(&self) -> Result<AccessToken>;
}

/// A token managed outside this crate. Never expires from the crate's point of view.
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    /// Create a new static token provider.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token, DateTime::<Utc>::MAX_UTC),
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<AccessToken> {
        Ok(self.token.clone())
    }
}

/// Single-flight token cache.
///
/// The async mutex is held across the refresh, so concurrent callers wait for
/// one acquisition instead of racing. The refresh is bounded by
/// `refresh_timeout`; a timed out or cancelled refresh leaves the slot
/// untouched and releases the lock.
#[derive(Debug)]
pub(crate) struct TokenCache {
    slot: Mutex<Option<AccessToken>>,
    window: Duration,
    refresh_timeout: std::time::Duration,
}

impl TokenCache {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            window: Duration::seconds(EXPIRY_SAFETY_WINDOW_SECS),
            refresh_timeout: TOKEN_REQUEST_TIMEOUT,
        }
    }

    pub(crate) fn with_refresh_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub(crate) async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<AccessToken>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref()
            && !token.expires_within(self.window)
        {
            return Ok(token.clone());
        }
        let fresh = tokio::time::timeout(self.refresh_timeout, refresh())
            .await
            .map_err(|_| {
                EndpointError::HttpError(format!(
                    "token acquisition timed out after {:?}",
                    self.refresh_timeout
                ))
            })??;
        *slot = Some(fresh.clone());
        Ok(fresh)
    }
}

/// Identity endpoints disagree on whether numbers are JSON numbers or strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberOrString {
    Number(i64),
    String(String),
}

impl NumberOrString {
    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
        }
    }
}

/// Absolute expiry from `expires_on` (unix seconds) or, failing that,
/// `expires_in` (seconds from now). Defaults to one hour. Values outside the
/// representable range are a [`EndpointError::ParseError`].
pub(crate) fn expiry_from(
    expires_on: Option<&NumberOrString>,
    expires_in: Option<&NumberOrString>,
) -> Result<DateTime<Utc>> {
    if let Some(ts) = expires_on.and_then(NumberOrString::as_i64) {
        return DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| {
            EndpointError::ParseError(format!("token expires_on {ts} is out of range"))
        });
    }
    let secs = expires_in.and_then(NumberOrString::as_i64).unwrap_or(3600);
    Duration::try_seconds(secs)
        .and_then(|d| Utc::now().checked_add_signed(d))
        .ok_or_else(|| EndpointError::ParseError(format!("token expires_in {secs} is out of range")))
}

/// Resource form of a `.default` scope, used by the managed identity endpoints.
pub(crate) fn scope_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}
