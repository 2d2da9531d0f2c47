//! Built configurations.
//!
//! An [`OpenAiConfiguration`] is built once from [`Settings`]: the backend is
//! selected, the version table seeded, the endpoint tables and the credential
//! flow constructed. Everything is immutable afterwards and shared through
//! `Arc`.
//!
//! ```rust
//! use openai_endpoints::{ApiType, OpenAiConfiguration, Settings};
//!
//! let config = OpenAiConfiguration::new(Settings::new()).unwrap();
//! assert_eq!(
//!     config.resolve(ApiType::Chat, None, false, "").unwrap(),
//!     "https://api.openai.com/v1/chat/completions"
//! );
//! assert!(!config.needs_enrichment());
//! ```

use crate::auth::{CredentialFlow, TokenProvider, default_identity_client};
use crate::backend::Backend;
use crate::config::Settings;
use crate::endpoints::EndpointResolver;
use crate::enrich::RequestEnricher;
use crate::error::{EndpointError, Result};
use crate::types::ApiType;
use crate::version::VersionResolver;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the configuration used when a caller does not pick one.
pub const DEFAULT_CONFIGURATION_NAME: &str = "";

/// Immutable endpoint and credential configuration, built once from [`Settings`].
#[derive(Debug, Clone)]
pub struct OpenAiConfiguration {
    name: String,
    settings: Arc<Settings>,
    backend: Backend,
    versions: VersionResolver,
    endpoints: EndpointResolver,
    enricher: RequestEnricher,
}

impl OpenAiConfiguration {
    /// Build the default-named configuration with a fresh HTTP client.
    pub fn new(settings: Settings) -> Result<Self> {
        Self::builder(settings).build()
    }

    /// Start a builder for a named configuration or custom credentials.
    pub fn builder(settings: Settings) -> OpenAiConfigurationBuilder {
        OpenAiConfigurationBuilder::new(settings)
    }

    /// Name the configuration is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The frozen settings this configuration was built from.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The active backend.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// API version used for `api_type`.
    pub fn version(&self, api_type: ApiType) -> &str {
        self.versions.resolve(api_type)
    }

    /// The endpoint tables.
    pub fn endpoints(&self) -> &EndpointResolver {
        &self.endpoints
    }

    /// The request enricher bound to the selected credential flow.
    pub fn enricher(&self) -> &RequestEnricher {
        &self.enricher
    }

    /// See [`EndpointResolver::resolve`].
    pub fn resolve(
        &self,
        api_type: ApiType,
        model_id: Option<&str>,
        force_default: bool,
        suffix: &str,
    ) -> Result<String> {
        self.endpoints
            .resolve(api_type, model_id, force_default, suffix)
    }

    /// See [`RequestEnricher::needs_enrichment`].
    pub fn needs_enrichment(&self) -> bool {
        self.enricher.needs_enrichment()
    }

    /// See [`RequestEnricher::enrich_headers`].
    pub async fn enrich_headers(&self, headers: &mut HeaderMap) -> Result<()> {
        self.enricher.enrich_headers(headers).await
    }

    /// See [`RequestEnricher::enrich`].
    pub async fn enrich(&self, request: &mut reqwest::Request) -> Result<()> {
        self.enricher.enrich(request).await
    }
}

/// Builder for [`OpenAiConfiguration`].
pub struct OpenAiConfigurationBuilder {
    name: String,
    settings: Settings,
    http_client: Option<reqwest::Client>,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl OpenAiConfigurationBuilder {
    /// Create a builder for the default-named configuration.
    pub fn new(settings: Settings) -> Self {
        Self {
            name: DEFAULT_CONFIGURATION_NAME.to_string(),
            settings,
            http_client: None,
            token_provider: None,
        }
    }

    /// Set the configuration name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// HTTP client used by the credential flows to reach the identity endpoints.
    ///
    /// Defaults to a client with a request timeout; a supplied client is used
    /// as is, and each acquisition is still bounded by the token cache.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Replace the settings-selected credential flow of the managed backend.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Validate the settings and build every table. Malformed settings fail here,
    /// never at first request.
    pub fn build(self) -> Result<OpenAiConfiguration> {
        self.settings.validate()?;

        let backend = Backend::select(&self.settings);
        let versions = VersionResolver::new(&self.settings, backend);
        let endpoints = EndpointResolver::build(&self.settings, backend, &versions)?;

        let flow = match (&self.settings.managed, backend) {
            (Some(managed), Backend::Managed) => match self.token_provider {
                Some(provider) => {
                    // Still reject contradictory descriptors.
                    managed.credential()?;
                    CredentialFlow::Custom(provider)
                }
                None => {
                    let http = match self.http_client {
                        Some(client) => client,
                        None => default_identity_client()?,
                    };
                    CredentialFlow::from_settings(managed, http)?
                }
            },
            _ => {
                if self.token_provider.is_some() {
                    tracing::debug!(
                        name = %self.name,
                        "token provider ignored: direct backend sends no bearer token"
                    );
                }
                CredentialFlow::None
            }
        };

        tracing::debug!(
            name = %self.name,
            ?backend,
            version = versions.default_version(),
            authenticated = flow.is_configured(),
            "configuration built"
        );

        Ok(OpenAiConfiguration {
            name: self.name,
            settings: Arc::new(self.settings),
            backend,
            versions,
            endpoints,
            enricher: RequestEnricher::new(flow),
        })
    }
}

impl std::fmt::Debug for OpenAiConfigurationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfigurationBuilder")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("has_http_client", &self.http_client.is_some())
            .field("has_token_provider", &self.token_provider.is_some())
            .finish()
    }
}

/// Named configurations registered side by side.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationSet {
    configurations: HashMap<String, Arc<OpenAiConfiguration>>,
}

impl ConfigurationSet {
    /// Collect built configurations. Two configurations sharing a name is an error.
    pub fn new(configurations: impl IntoIterator<Item = OpenAiConfiguration>) -> Result<Self> {
        let mut map = HashMap::new();
        for config in configurations {
            let name = config.name().to_string();
            if map.contains_key(&name) {
                return Err(EndpointError::ConfigurationError(format!(
                    "configuration '{name}' is registered twice"
                )));
            }
            map.insert(name, Arc::new(config));
        }
        Ok(Self {
            configurations: map,
        })
    }

    /// Look up a configuration by name.
    pub fn get(&self, name: &str) -> Result<Arc<OpenAiConfiguration>> {
        self.configurations
            .get(name)
            .cloned()
            .ok_or_else(|| EndpointError::UnknownConfiguration(name.to_string()))
    }

    /// The configuration registered under [`DEFAULT_CONFIGURATION_NAME`].
    pub fn default_configuration(&self) -> Result<Arc<OpenAiConfiguration>> {
        self.get(DEFAULT_CONFIGURATION_NAME)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.configurations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered configurations.
    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    /// True when no configuration is registered.
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}
