//! Settings consumed by the resolver and the credential flows.
//!
//! Settings are plain values: they are built once (from code, a JSON
//! document or the environment, see [`env`]) and handed to
//! [`OpenAiConfiguration`](crate::configuration::OpenAiConfiguration), which
//! freezes them behind an `Arc`.

pub mod env;

use crate::error::{EndpointError, Result};
use crate::types::ApiType;
use secrecy::{ExposeSecret, SecretString};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Global API version. When unset the active backend's default is used.
    pub version: Option<String>,
    /// Per-type version overrides.
    pub versions: HashMap<ApiType, String>,
    /// Managed (Azure-style) backend block. Its presence selects that backend.
    #[serde(alias = "azure")]
    pub managed: Option<ManagedBackendSettings>,
}

impl Settings {
    /// Empty settings: direct backend, default versions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| EndpointError::ConfigurationError(format!("Invalid settings JSON: {e}")))
    }

    /// Parse settings from an already decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| EndpointError::ConfigurationError(format!("Invalid settings value: {e}")))
    }

    /// Set the global API version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Override the version of one API type.
    pub fn with_type_version(mut self, api_type: ApiType, version: impl Into<String>) -> Self {
        self.versions.insert(api_type, version.into());
        self
    }

    /// Attach a managed backend block.
    pub fn with_managed_backend(mut self, managed: ManagedBackendSettings) -> Self {
        self.managed = Some(managed);
        self
    }

    /// Reject settings that cannot produce a working configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(v) = &self.version
            && v.trim().is_empty()
        {
            return Err(EndpointError::ConfigurationError(
                "version cannot be blank".to_string(),
            ));
        }
        for (api_type, v) in &self.versions {
            if v.trim().is_empty() {
                return Err(EndpointError::ConfigurationError(format!(
                    "version override for {api_type} cannot be blank"
                )));
            }
        }
        if let Some(managed) = &self.managed {
            managed.validate()?;
        }
        Ok(())
    }
}

/// One `alias -> deployment name` entry of the managed backend mapping.
///
/// The alias is what appears in the URI (`/deployments/{alias}/...`); the
/// deployment name is what callers pass as the model/deployment id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeploymentMapping {
    pub alias: String,
    pub name: String,
}

impl DeploymentMapping {
    pub fn new(alias: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            name: name.into(),
        }
    }
}

/// Managed-identity credential descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManagedIdentitySettings {
    /// Client id of a user-assigned identity. `None` uses the platform default.
    pub client_id: Option<String>,
}

/// App registration (client credential) descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRegistrationSettings {
    pub client_id: String,
    #[serde(deserialize_with = "deserialize_secret")]
    pub client_secret: SecretString,
    pub tenant_id: String,
}

impl AppRegistrationSettings {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            tenant_id: tenant_id.into(),
        }
    }
}

/// The credential descriptor selected from [`ManagedBackendSettings`].
#[derive(Debug, Clone, Copy)]
pub enum CredentialSettings<'a> {
    ManagedIdentity(&'a ManagedIdentitySettings),
    AppRegistration(&'a AppRegistrationSettings),
}

/// Settings for the multi-tenant managed deployment backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedBackendSettings {
    /// Resource name; forms the host `{resource}.openai.azure.com`.
    pub resource_name: String,
    /// Ordered alias mapping. Aliases are unique.
    #[serde(default, deserialize_with = "deserialize_deployments")]
    pub deployments: Vec<DeploymentMapping>,
    /// Deployment used by forced resolution when the caller passes no id.
    #[serde(default)]
    pub default_deployment: Option<String>,
    #[serde(default)]
    pub managed_identity: Option<ManagedIdentitySettings>,
    #[serde(default)]
    pub app_registration: Option<AppRegistrationSettings>,
}

impl ManagedBackendSettings {
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            deployments: Vec::new(),
            default_deployment: None,
            managed_identity: None,
            app_registration: None,
        }
    }

    /// Map `alias` to `name`. Re-mapping an existing alias replaces its name
    /// in place.
    pub fn with_deployment(mut self, alias: impl Into<String>, name: impl Into<String>) -> Self {
        let mapping = DeploymentMapping::new(alias, name);
        match self.deployments.iter_mut().find(|d| d.alias == mapping.alias) {
            Some(existing) => existing.name = mapping.name,
            None => self.deployments.push(mapping),
        }
        self
    }

    /// Deployment used when a caller passes no id.
    pub fn with_default_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.default_deployment = Some(deployment.into());
        self
    }

    /// Authenticate with the platform identity, optionally a user-assigned one.
    pub fn with_managed_identity(mut self, client_id: Option<String>) -> Self {
        self.managed_identity = Some(ManagedIdentitySettings { client_id });
        self
    }

    /// Authenticate with an app registration.
    pub fn with_app_registration(mut self, app: AppRegistrationSettings) -> Self {
        self.app_registration = Some(app);
        self
    }

    /// True when the block carries enough to address a resource.
    pub fn has_configuration(&self) -> bool {
        !self.resource_name.trim().is_empty() && !self.deployments.is_empty()
    }

    /// Select the credential descriptor. Both present is a configuration error.
    pub fn credential(&self) -> Result<Option<CredentialSettings<'_>>> {
        match (&self.managed_identity, &self.app_registration) {
            (Some(_), Some(_)) => Err(EndpointError::ConfigurationError(
                "managed identity and app registration are mutually exclusive; configure only one"
                    .to_string(),
            )),
            (Some(mi), None) => Ok(Some(CredentialSettings::ManagedIdentity(mi))),
            (None, Some(app)) => Ok(Some(CredentialSettings::AppRegistration(app))),
            (None, None) => Ok(None),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let resource = self.resource_name.trim();
        if !resource
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(EndpointError::ConfigurationError(format!(
                "resource name '{}' cannot form a host name",
                self.resource_name
            )));
        }
        for d in &self.deployments {
            if d.alias.trim().is_empty() || d.name.trim().is_empty() {
                return Err(EndpointError::ConfigurationError(format!(
                    "deployment mapping '{}' -> '{}' has a blank side",
                    d.alias, d.name
                )));
            }
        }
        for (i, d) in self.deployments.iter().enumerate() {
            if self.deployments[..i].iter().any(|p| p.alias == d.alias) {
                return Err(EndpointError::ConfigurationError(format!(
                    "deployment alias '{}' is mapped twice",
                    d.alias
                )));
            }
        }
        if let Some(CredentialSettings::AppRegistration(app)) = self.credential()? {
            let blank = [
                ("client id", app.client_id.trim().is_empty()),
                (
                    "client secret",
                    app.client_secret.expose_secret().trim().is_empty(),
                ),
                ("tenant id", app.tenant_id.trim().is_empty()),
            ];
            if let Some((field, _)) = blank.iter().find(|(_, is_blank)| *is_blank) {
                return Err(EndpointError::ConfigurationError(format!(
                    "app registration {field} cannot be blank"
                )));
            }
        }
        Ok(())
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Accepts either a list of `{ alias, name }` objects or a plain
/// `{ "alias": "name" }` object. Object entries keep document order and an
/// alias repeated inside the object is rejected.
fn deserialize_deployments<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<DeploymentMapping>, D::Error>
where
    D: Deserializer<'de>,
{
    struct DeploymentsVisitor;

    impl<'de> Visitor<'de> for DeploymentsVisitor {
        type Value = Vec<DeploymentMapping>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of { alias, name } objects or an alias -> name object")
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(mapping) = seq.next_element::<DeploymentMapping>()? {
                out.push(mapping);
            }
            Ok(out)
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out: Vec<DeploymentMapping> = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((alias, name)) = map.next_entry::<String, String>()? {
                if out.iter().any(|d| d.alias == alias) {
                    return Err(de::Error::custom(format!(
                        "deployment alias '{alias}' is mapped twice"
                    )));
                }
                out.push(DeploymentMapping { alias, name });
            }
            Ok(out)
        }
    }

    deserializer.deserialize_any(DeploymentsVisitor)
}
