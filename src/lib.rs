//! openai-endpoints
//!
//! Endpoint resolution and request authentication for the direct OpenAI API
//! and Azure-style managed deployments.
//!
//! A [`Settings`] value is turned once into an immutable
//! [`OpenAiConfiguration`], which then:
//! - resolves the absolute URI for an [`ApiType`] and optional model or
//!   deployment id ([`OpenAiConfiguration::resolve`]);
//! - stamps outgoing requests with a bearer token when the managed backend
//!   carries a credential ([`OpenAiConfiguration::enrich`]).
//!
//! ```rust
//! use openai_endpoints::{ApiType, ManagedBackendSettings, OpenAiConfiguration, Settings};
//!
//! let settings = Settings::new()
//!     .with_type_version(ApiType::Chat, "2023-05-15")
//!     .with_managed_backend(ManagedBackendSettings::new("myres").with_deployment("gpt4", "gpt4-deploy"));
//! let config = OpenAiConfiguration::new(settings).unwrap();
//! assert_eq!(
//!     config.resolve(ApiType::Chat, Some("gpt4"), false, "").unwrap(),
//!     "https://myres.openai.azure.com/openai/deployments/gpt4/chat/completions?api-version=2023-05-15"
//! );
//! ```
#![deny(unsafe_code)]

pub mod auth;
pub mod backend;
pub mod config;
pub mod configuration;
pub mod endpoints;
pub mod enrich;
pub mod error;
pub mod types;
pub mod version;

pub use auth::{AccessToken, CredentialFlow, StaticTokenProvider, TokenProvider};
pub use backend::Backend;
pub use config::{
    AppRegistrationSettings, DeploymentMapping, ManagedBackendSettings, ManagedIdentitySettings,
    Settings,
};
pub use configuration::{ConfigurationSet, OpenAiConfiguration, OpenAiConfigurationBuilder};
pub use endpoints::EndpointResolver;
pub use enrich::RequestEnricher;
pub use error::{EndpointError, Result};
pub use types::ApiType;
pub use version::VersionResolver;
