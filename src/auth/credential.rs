//! Credential flow selection.
//!
//! The flow is chosen once when a configuration is built and dispatched on
//! every token request without re-reading settings.

use super::{AccessToken, ClientSecretCredential, ManagedIdentityCredential, TokenProvider};
use crate::config::{CredentialSettings, ManagedBackendSettings};
use crate::error::Result;
use reqwest::Client;
use std::sync::Arc;

/// The token acquisition strategy of a configuration.
pub enum CredentialFlow {
    /// Ambient platform identity.
    ManagedIdentity(ManagedIdentityCredential),
    /// Confidential client built from an app registration.
    ClientCredential(ClientSecretCredential),
    /// Caller-supplied provider.
    Custom(Arc<dyn TokenProvider>),
    /// Requests are sent unauthenticated.
    None,
}

impl CredentialFlow {
    /// Select the flow from the managed backend block.
    ///
    /// Fails when both credential descriptors are present.
    pub fn from_settings(managed: &ManagedBackendSettings, http: Client) -> Result<Self> {
        let flow = match managed.credential()? {
            Some(CredentialSettings::ManagedIdentity(mi)) => {
                tracing::debug!(client_id = ?mi.client_id, "using managed identity credential");
                Self::ManagedIdentity(ManagedIdentityCredential::new(http, mi.client_id.clone()))
            }
            Some(CredentialSettings::AppRegistration(app)) => {
                tracing::debug!(
                    tenant_id = %app.tenant_id,
                    client_id = %app.client_id,
                    "using client credential flow"
                );
                Self::ClientCredential(ClientSecretCredential::from_settings(http, app))
            }
            None => {
                tracing::warn!(
                    resource = %managed.resource_name,
                    "managed backend has no credential configured; requests will be sent unauthenticated"
                );
                Self::None
            }
        };
        Ok(flow)
    }

    /// False for [`CredentialFlow::None`].
    pub fn is_configured(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Acquire a token from the selected flow. `Ok(None)` when no flow is configured.
    pub async fn acquire_token(&self) -> Result<Option<AccessToken>> {
        let token = match self {
            Self::ManagedIdentity(c) => c.token().await?,
            Self::ClientCredential(c) => c.token().await?,
            Self::Custom(p) => p.token().await?,
            Self::None => return Ok(None),
        };
        Ok(Some(token))
    }
}

impl std::fmt::Debug for CredentialFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManagedIdentity(c) => f.debug_tuple("ManagedIdentity").field(c).finish(),
            Self::ClientCredential(c) => f.debug_tuple("ClientCredential").field(c).finish(),
            Self::Custom(_) => f.write_str("Custom"),
            Self::None => f.write_str("None"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use crate::config::AppRegistrationSettings;

    #[test]
    fn selects_flow_from_descriptor() {
        let base = ManagedBackendSettings::new("res").with_deployment("a", "b");

        let flow = CredentialFlow::from_settings(
            &base.clone().with_managed_identity(Some("mi".into())),
            Client::new(),
        )
        .unwrap();
        assert!(matches!(flow, CredentialFlow::ManagedIdentity(ref c) if c.client_id() == Some("mi")));

        let app = AppRegistrationSettings::new("cid", "s", "tid");
        let flow =
            CredentialFlow::from_settings(&base.clone().with_app_registration(app), Client::new())
                .unwrap();
        assert!(matches!(flow, CredentialFlow::ClientCredential(_)));

        let flow = CredentialFlow::from_settings(&base, Client::new()).unwrap();
        assert!(!flow.is_configured());
    }

    #[test]
    fn both_descriptors_fail_fast() {
        let app = AppRegistrationSettings::new("cid", "s", "tid");
        let managed = ManagedBackendSettings::new("res")
            .with_deployment("a", "b")
            .with_managed_identity(None)
            .with_app_registration(app);
        let err = CredentialFlow::from_settings(&managed, Client::new()).unwrap_err();
        assert!(matches!(err, crate::error::EndpointError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn none_yields_no_token() {
        assert!(CredentialFlow::None.acquire_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn custom_provider_is_used() {
        let flow = CredentialFlow::Custom(Arc::new(StaticTokenProvider::new("tok")));
        let token = flow.acquire_token().await.unwrap().unwrap();
        assert_eq!(token.secret(), "tok");
        assert_eq!(format!("{flow:?}"), "Custom");
    }
}
