//! Error Handling Module
//!
//! A single error type covers endpoint resolution, configuration building and
//! token acquisition.
//!
//! # Example
//!
//! ```rust
//! use openai_endpoints::error::{EndpointError, ErrorCategory};
//! use openai_endpoints::types::ApiType;
//!
//! let error = EndpointError::unregistered("gpt-4", ApiType::Chat);
//! assert_eq!(error.category(), ErrorCategory::Configuration);
//! assert!(!error.is_retryable());
//! ```

use crate::types::ApiType;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EndpointError>;

/// Errors raised while building a configuration, resolving an endpoint or
/// authenticating a request.
#[derive(Debug, Clone, Error)]
pub enum EndpointError {
    /// A deployment-scoped endpoint was requested for a model or deployment
    /// that was never mapped in the managed backend settings.
    #[error(
        "Model {model_id} of {api_type} is not registered during startup. \
         Add a deployment for it to the managed backend settings before building the configuration."
    )]
    UnregisteredDeployment { model_id: String, api_type: ApiType },

    /// Settings are contradictory or incomplete.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The identity provider refused to issue a token.
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Transport failure while talking to the identity provider.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// A token response could not be decoded.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// An acquired token cannot be carried in a header value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// No configuration was registered under the requested name.
    #[error("Unknown configuration: '{0}'")]
    UnknownConfiguration(String),
}

/// Coarse classification of an [`EndpointError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Network,
    Parsing,
}

impl EndpointError {
    /// Build the error for a model/deployment id missing from the registry.
    pub fn unregistered(model_id: impl Into<String>, api_type: ApiType) -> Self {
        Self::UnregisteredDeployment {
            model_id: model_id.into(),
            api_type,
        }
    }

    /// Coarse category, for callers that branch on the kind of failure.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnregisteredDeployment { .. }
            | Self::ConfigurationError(_)
            | Self::UnknownConfiguration(_) => ErrorCategory::Configuration,
            Self::AuthenticationError(_) | Self::InvalidHeader(_) => ErrorCategory::Authentication,
            Self::HttpError(_) => ErrorCategory::Network,
            Self::ParseError(_) => ErrorCategory::Parsing,
        }
    }

    /// Whether a caller may reasonably retry the failed operation.
    ///
    /// Nothing in this crate retries; the flag is informational for the
    /// caller's own policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::HttpError(_))
    }

    /// True for token acquisition and header failures.
    pub fn is_auth_error(&self) -> bool {
        self.category() == ErrorCategory::Authentication
    }
}

impl From<reqwest::Error> for EndpointError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for EndpointError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}
