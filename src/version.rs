//! API version resolution.

use crate::backend::Backend;
use crate::config::Settings;
use crate::types::ApiType;
use std::collections::HashMap;

/// Resolves the version string for an [`ApiType`]: per-type override first,
/// then the global version, then the backend default. Never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionResolver {
    default: String,
    overrides: HashMap<ApiType, String>,
}

impl VersionResolver {
    /// Seed the resolver from the settings and the active backend's default.
    pub fn new(settings: &Settings, backend: Backend) -> Self {
        Self {
            default: settings
                .version
                .clone()
                .unwrap_or_else(|| backend.default_version().to_string()),
            overrides: settings.versions.clone(),
        }
    }

    /// Version for `api_type`.
    pub fn resolve(&self, api_type: ApiType) -> &str {
        self.overrides
            .get(&api_type)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }

    /// The global version after backend defaulting.
    pub fn default_version(&self) -> &str {
        &self.default
    }
}
