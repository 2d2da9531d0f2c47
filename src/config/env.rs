//! Environment-driven settings loader.
//!
//! Recognized variables:
//! - `OPENAI_API_VERSION`: global version
//! - `OPENAI_API_VERSION_<TYPE>`: per-type override, e.g. `OPENAI_API_VERSION_CHAT`
//! - `AZURE_OPENAI_RESOURCE`: selects the managed backend
//! - `AZURE_OPENAI_DEPLOYMENTS`: `alias=name,alias=name`
//! - `AZURE_OPENAI_DEFAULT_DEPLOYMENT`
//! - `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`, `AZURE_TENANT_ID`: app registration
//! - `AZURE_OPENAI_USE_MANAGED_IDENTITY`: `true`/`1` selects managed identity,
//!   with `AZURE_CLIENT_ID` (if set) as the user-assigned identity

use super::{AppRegistrationSettings, ManagedBackendSettings, Settings};
use crate::error::{EndpointError, Result};
use crate::types::ApiType;

pub const VERSION_VAR: &str = "OPENAI_API_VERSION";
pub const RESOURCE_VAR: &str = "AZURE_OPENAI_RESOURCE";
pub const DEPLOYMENTS_VAR: &str = "AZURE_OPENAI_DEPLOYMENTS";
pub const DEFAULT_DEPLOYMENT_VAR: &str = "AZURE_OPENAI_DEFAULT_DEPLOYMENT";
pub const USE_MANAGED_IDENTITY_VAR: &str = "AZURE_OPENAI_USE_MANAGED_IDENTITY";
pub const CLIENT_ID_VAR: &str = "AZURE_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "AZURE_CLIENT_SECRET";
pub const TENANT_ID_VAR: &str = "AZURE_TENANT_ID";

/// Load settings from the process environment.
pub fn settings_from_env() -> Result<Settings> {
    settings_from_lookup(|key| std::env::var(key).ok())
}

/// Load settings through an arbitrary variable lookup. Empty values count as unset.
pub fn settings_from_lookup<F>(lookup: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let mut settings = Settings::new();
    if let Some(version) = get(VERSION_VAR) {
        settings = settings.with_version(version);
    }
    for api_type in ApiType::ALL {
        let key = format!("{VERSION_VAR}_{}", env_suffix(api_type));
        if let Some(version) = get(&key) {
            settings = settings.with_type_version(api_type, version);
        }
    }

    let Some(resource) = get(RESOURCE_VAR) else {
        return Ok(settings);
    };

    let mut managed = ManagedBackendSettings::new(resource);
    if let Some(raw) = get(DEPLOYMENTS_VAR) {
        for (alias, name) in parse_deployments(&raw)? {
            managed = managed.with_deployment(alias, name);
        }
    }
    if let Some(default) = get(DEFAULT_DEPLOYMENT_VAR) {
        managed = managed.with_default_deployment(default);
    }

    let use_managed_identity = get(USE_MANAGED_IDENTITY_VAR)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    if use_managed_identity {
        managed = managed.with_managed_identity(get(CLIENT_ID_VAR));
    } else if let (Some(client_id), Some(secret), Some(tenant)) = (
        get(CLIENT_ID_VAR),
        get(CLIENT_SECRET_VAR),
        get(TENANT_ID_VAR),
    ) {
        managed =
            managed.with_app_registration(AppRegistrationSettings::new(client_id, secret, tenant));
    }

    Ok(settings.with_managed_backend(managed))
}

/// `AudioTranscription` -> `AUDIO_TRANSCRIPTION`
fn env_suffix(api_type: ApiType) -> String {
    let mut out = String::new();
    for (i, c) in api_type.as_str().chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}

fn parse_deployments(raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(alias, name)| (alias.trim().to_string(), name.trim().to_string()))
                .filter(|(alias, name)| !alias.is_empty() && !name.is_empty())
                .ok_or_else(|| {
                    EndpointError::ConfigurationError(format!(
                        "{DEPLOYMENTS_VAR} entry '{entry}' must look like alias=name"
                    ))
                })
        })
        .collect()
}
