//! Managed identity token flow.
//!
//! Source selection:
//! 1) App Service / Functions identity endpoint when both `IDENTITY_ENDPOINT`
//!    and `IDENTITY_HEADER` are set
//! 2) otherwise the instance metadata service (IMDS)
//!
//! An optional client id constrains the request to a user-assigned identity.

use super::{
    AccessToken, COGNITIVE_SERVICES_SCOPE, NumberOrString, TokenCache, TokenProvider,
    expiry_from, scope_resource,
};
use crate::error::{EndpointError, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";
const IDENTITY_ENDPOINT_VAR: &str = "IDENTITY_ENDPOINT";
const IDENTITY_HEADER_VAR: &str = "IDENTITY_HEADER";

#[derive(Debug, Clone)]
enum IdentitySource {
    Imds { endpoint: String },
    AppService { endpoint: String, header: SecretString },
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<NumberOrString>,
    #[serde(default)]
    expires_in: Option<NumberOrString>,
}

/// Token provider backed by the ambient platform identity.
#[derive(Debug)]
pub struct ManagedIdentityCredential {
    http: Client,
    client_id: Option<String>,
    scope: String,
    source: IdentitySource,
    cache: TokenCache,
}

impl ManagedIdentityCredential {
    /// Create a credential, detecting the identity endpoint from the environment.
    pub fn new(http: Client, client_id: Option<String>) -> Self {
        let source = match (
            std::env::var(IDENTITY_ENDPOINT_VAR).ok().filter(|v| !v.is_empty()),
            std::env::var(IDENTITY_HEADER_VAR).ok().filter(|v| !v.is_empty()),
        ) {
            (Some(endpoint), Some(header)) => IdentitySource::AppService {
                endpoint,
                header: SecretString::from(header),
            },
            _ => IdentitySource::Imds {
                endpoint: IMDS_ENDPOINT.to_string(),
            },
        };
        Self {
            http,
            client_id: client_id.filter(|id| !id.trim().is_empty()),
            scope: COGNITIVE_SERVICES_SCOPE.to_string(),
            source,
            cache: TokenCache::new(),
        }
    }

    /// Use an explicit IMDS-compatible endpoint.
    pub fn with_imds_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.source = IdentitySource::Imds {
            endpoint: endpoint.into(),
        };
        self
    }

    /// Use an explicit App Service identity endpoint and secret header.
    pub fn with_app_service_endpoint(
        mut self,
        endpoint: impl Into<String>,
        header: impl Into<String>,
    ) -> Self {
        self.source = IdentitySource::AppService {
            endpoint: endpoint.into(),
            header: SecretString::from(header.into()),
        };
        self
    }

    /// Override the requested scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// User-assigned identity client id, if any.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    async fn fetch(&self) -> Result<AccessToken> {
        let resource = scope_resource(&self.scope);
        let mut query: Vec<(&str, &str)> = vec![("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let request = match &self.source {
            IdentitySource::Imds { endpoint } => {
                query.push(("api-version", IMDS_API_VERSION));
                self.http.get(endpoint).header("Metadata", "true")
            }
            IdentitySource::AppService { endpoint, header } => {
                query.push(("api-version", APP_SERVICE_API_VERSION));
                self.http
                    .get(endpoint)
                    .header("X-IDENTITY-HEADER", header.expose_secret())
            }
        };

        let resp = request.query(&query).send().await.map_err(|e| {
            EndpointError::HttpError(format!("Managed identity endpoint request failed: {e}"))
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EndpointError::AuthenticationError(format!(
                "Managed identity endpoint returned {status}: {body}"
            )));
        }

        let tr: TokenResponse = resp.json().await.map_err(|e| {
            EndpointError::ParseError(format!("Failed to parse managed identity token response: {e}"))
        })?;
        Ok(AccessToken::new(
            tr.access_token,
            expiry_from(tr.expires_on.as_ref(), tr.expires_in.as_ref())?,
        ))
    }
}

#[async_trait::async_trait]
impl TokenProvider for ManagedIdentityCredential {
    #[tracing::instrument(skip_all, fields(client_id = ?self.client_id))]
    async fn token(&self) -> Result<AccessToken> {
        self.cache
            .get_or_refresh(|| async {
                tracing::debug!("acquiring managed identity token");
                self.fetch().await
            })
            .await
    }
}
