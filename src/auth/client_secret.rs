//! Client credential (app registration) token flow.
//!
//! Exchanges `{client id, client secret}` for an access token at
//! `{authority}/{tenant}/oauth2/v2.0/token`. Tokens are cached in-memory and
//! refreshed before expiration.

use super::{
    AccessToken, COGNITIVE_SERVICES_SCOPE, NumberOrString, TokenCache, TokenProvider, expiry_from,
};
use crate::config::AppRegistrationSettings;
use crate::error::{EndpointError, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Default Microsoft Entra authority.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const AUTHORITY_HOST_VAR: &str = "AZURE_AUTHORITY_HOST";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<NumberOrString>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Confidential client token provider.
#[derive(Debug)]
pub struct ClientSecretCredential {
    http: Client,
    tenant_id: String,
    client_id: String,
    client_secret: SecretString,
    authority_host: String,
    scope: String,
    cache: TokenCache,
}

impl ClientSecretCredential {
    /// Create a credential. The authority host comes from
    /// `AZURE_AUTHORITY_HOST` when set.
    pub fn new(
        http: Client,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        let authority_host = std::env::var(AUTHORITY_HOST_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string());
        Self {
            http,
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret,
            authority_host,
            scope: COGNITIVE_SERVICES_SCOPE.to_string(),
            cache: TokenCache::new(),
        }
    }

    /// Create a credential from an app registration descriptor.
    pub fn from_settings(http: Client, app: &AppRegistrationSettings) -> Self {
        Self::new(
            http,
            app.tenant_id.clone(),
            app.client_id.clone(),
            app.client_secret.clone(),
        )
    }

    /// Override the authority host (sovereign clouds, tests).
    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    /// Override the requested scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// `{authority}/{tenant}/oauth2/v2.0/token`
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    async fn fetch(&self) -> Result<AccessToken> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", self.scope.as_str()),
        ];

        let resp = self
            .http
            .post(self.token_endpoint())
            .form(&form)
            .send()
            .await
            .map_err(|e| EndpointError::HttpError(format!("Token endpoint request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or(body);
            return Err(EndpointError::AuthenticationError(format!(
                "Token endpoint returned {status}: {detail}"
            )));
        }

        let tr: TokenResponse = resp
            .json()
            .await
            .map_err(|e| EndpointError::ParseError(format!("Failed to parse token response: {e}")))?;
        Ok(AccessToken::new(
            tr.access_token,
            expiry_from(None, tr.expires_in.as_ref())?,
        ))
    }
}

#[async_trait::async_trait]
impl TokenProvider for ClientSecretCredential {
    #[tracing::instrument(skip_all, fields(tenant_id = %self.tenant_id, client_id = %self.client_id))]
    async fn token(&self) -> Result<AccessToken> {
        self.cache
            .get_or_refresh(|| async {
                tracing::debug!("acquiring client credential token");
                self.fetch().await
            })
            .await
    }
}
