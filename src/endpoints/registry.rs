//! Deployment registry of the managed backend.
//!
//! Built once from [`ManagedBackendSettings`]:
//! 1. a `"{0}"` placeholder alias mapped to `"Forced"` is added unless the
//!    caller mapped `"{0}"` already;
//! 2. every `(alias, name)` pair yields one route per deployment-scoped
//!    [`ApiType`], keyed `name_Type`. The first pair registering a key keeps it;
//! 3. resource-wide types get a single template under `/openai`.
//!
//! Forced resolution fills the placeholder segment with the requested id,
//! else the configured default deployment, else the first registered alias.

use super::uri::{DeploymentSegment, EndpointUri};
use crate::config::{DeploymentMapping, ManagedBackendSettings};
use crate::error::{EndpointError, Result};
use crate::types::ApiType;
use crate::version::VersionResolver;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

/// Placeholder alias whose URI segment is filled with the requested id.
pub const DEFAULT_DEPLOYMENT_ALIAS: &str = "{0}";
/// Deployment name synthesized for the placeholder alias.
pub const FORCED_DEPLOYMENT: &str = "Forced";

pub const MANAGED_HOST_SUFFIX: &str = "openai.azure.com";

/// `https://{resource}.openai.azure.com/openai`
pub fn managed_base_url(resource_name: &str) -> String {
    format!(
        "https://{}.{MANAGED_HOST_SUFFIX}/openai",
        resource_name.trim().to_ascii_lowercase()
    )
}

/// Composite `deployment_ApiType` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    deployment: String,
    api_type: ApiType,
}

impl RouteKey {
    /// Key for `deployment` (a name or an alias) and `api_type`.
    pub fn new(deployment: impl Into<String>, api_type: ApiType) -> Self {
        Self {
            deployment: deployment.into(),
            api_type,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.deployment, self.api_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRegistry {
    /// Routes keyed by deployment name (first registration wins).
    by_name: HashMap<RouteKey, EndpointUri>,
    /// Routes keyed by alias, consulted after `by_name`.
    by_alias: HashMap<RouteKey, EndpointUri>,
    resource_wide: HashMap<ApiType, EndpointUri>,
    forced_name: String,
    /// Segment used by forced resolution when the caller names nothing.
    fallback_segment: String,
    default_deployment: Option<String>,
}

impl DeploymentRegistry {
    /// Build every route for `managed`, versioned with `versions`.
    pub fn build(managed: &ManagedBackendSettings, versions: &VersionResolver) -> Self {
        let base = managed_base_url(&managed.resource_name);

        let mut deployments: Vec<DeploymentMapping> = managed.deployments.clone();
        if !deployments
            .iter()
            .any(|d| d.alias == DEFAULT_DEPLOYMENT_ALIAS)
        {
            tracing::debug!(
                resource = %managed.resource_name,
                "registering synthetic default deployment alias"
            );
            deployments.push(DeploymentMapping::new(
                DEFAULT_DEPLOYMENT_ALIAS,
                FORCED_DEPLOYMENT,
            ));
        }
        let forced_name = deployments
            .iter()
            .find(|d| d.alias == DEFAULT_DEPLOYMENT_ALIAS)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| FORCED_DEPLOYMENT.to_string());
        let fallback_segment = deployments
            .iter()
            .find(|d| d.alias != DEFAULT_DEPLOYMENT_ALIAS)
            .map(|d| d.alias.clone())
            .unwrap_or_else(|| forced_name.clone());

        let mut by_name = HashMap::new();
        let mut by_alias = HashMap::new();
        for d in &deployments {
            let segment = if d.alias == DEFAULT_DEPLOYMENT_ALIAS {
                DeploymentSegment::FromRequest
            } else {
                DeploymentSegment::Fixed(d.alias.clone())
            };
            for api_type in ApiType::deployment_scoped() {
                let uri = EndpointUri::deployment(
                    base.clone(),
                    segment.clone(),
                    api_type.path(),
                    versions.resolve(api_type),
                );
                match by_name.entry(RouteKey::new(d.name.clone(), api_type)) {
                    Entry::Occupied(e) => {
                        tracing::debug!(key = %e.key(), alias = %d.alias, "route already registered, keeping first");
                    }
                    Entry::Vacant(e) => {
                        e.insert(uri.clone());
                    }
                }
                if d.alias != DEFAULT_DEPLOYMENT_ALIAS {
                    by_alias
                        .entry(RouteKey::new(d.alias.clone(), api_type))
                        .or_insert(uri);
                }
            }
        }

        let resource_wide = ApiType::ALL
            .into_iter()
            .filter(|t| !t.is_deployment_scoped())
            .map(|t| {
                (
                    t,
                    EndpointUri::versioned(base.clone(), t.path(), versions.resolve(t)),
                )
            })
            .collect();

        tracing::debug!(
            resource = %managed.resource_name,
            routes = by_name.len(),
            "deployment registry built"
        );

        Self {
            by_name,
            by_alias,
            resource_wide,
            forced_name,
            fallback_segment,
            default_deployment: managed
                .default_deployment
                .clone()
                .filter(|d| !d.trim().is_empty()),
        }
    }

    /// Deployment name used for forced resolution.
    pub fn forced_name(&self) -> &str {
        &self.forced_name
    }

    /// Whether `deployment` (a name or an alias) has a route for `api_type`.
    pub fn contains(&self, deployment: &str, api_type: ApiType) -> bool {
        self.route(deployment, api_type).is_some()
    }

    fn route(&self, deployment: &str, api_type: ApiType) -> Option<&EndpointUri> {
        let key = RouteKey::new(deployment, api_type);
        self.by_name.get(&key).or_else(|| self.by_alias.get(&key))
    }

    /// Resolution policy: resource-wide template, else forced default, else
    /// explicit id, else [`EndpointError::UnregisteredDeployment`].
    pub fn resolve(
        &self,
        api_type: ApiType,
        model_id: Option<&str>,
        force_default: bool,
        suffix: &str,
    ) -> Result<String> {
        let model_id = model_id.filter(|id| !id.trim().is_empty());

        if !api_type.is_deployment_scoped() {
            return self
                .resource_wide
                .get(&api_type)
                .ok_or_else(|| {
                    EndpointError::ConfigurationError(format!(
                        "no resource endpoint for {api_type}"
                    ))
                })?
                .render(None, suffix);
        }

        if force_default {
            let route = self
                .route(&self.forced_name, api_type)
                .ok_or_else(|| EndpointError::unregistered(self.forced_name.clone(), api_type))?;
            let requested = model_id
                .or(self.default_deployment.as_deref())
                .unwrap_or(self.fallback_segment.as_str());
            return route.render(Some(requested), suffix);
        }

        let id = model_id
            .or(self.default_deployment.as_deref())
            .ok_or_else(|| EndpointError::unregistered("<none>", api_type))?;
        match self.route(id, api_type) {
            Some(route) => route.render(Some(id), suffix),
            None => Err(EndpointError::unregistered(id, api_type)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::config::Settings;

    fn registry(managed: ManagedBackendSettings) -> DeploymentRegistry {
        let settings = Settings::new().with_managed_backend(managed.clone());
        DeploymentRegistry::build(&managed, &VersionResolver::new(&settings, Backend::Managed))
    }

    #[test]
    fn route_key_display() {
        assert_eq!(RouteKey::new("Forced", ApiType::Chat).to_string(), "Forced_Chat");
    }

    #[test]
    fn synthesizes_placeholder_alias() {
        let reg = registry(ManagedBackendSettings::new("res").with_deployment("a", "b"));
        assert_eq!(reg.forced_name(), FORCED_DEPLOYMENT);
        for t in ApiType::deployment_scoped() {
            assert!(reg.contains(FORCED_DEPLOYMENT, t));
        }
    }

    #[test]
    fn explicit_placeholder_alias_is_kept() {
        let reg = registry(
            ManagedBackendSettings::new("res")
                .with_deployment("a", "b")
                .with_deployment(DEFAULT_DEPLOYMENT_ALIAS, "Fallback"),
        );
        assert_eq!(reg.forced_name(), "Fallback");
        assert!(!reg.contains(FORCED_DEPLOYMENT, ApiType::Chat));
        assert_eq!(
            reg.resolve(ApiType::Chat, Some("gpt-35"), true, "").unwrap(),
            "https://res.openai.azure.com/openai/deployments/gpt-35/chat/completions?api-version=2022-12-01"
        );
    }

    #[test]
    fn resource_wide_types_ignore_the_id() {
        let reg = registry(ManagedBackendSettings::new("Res").with_deployment("a", "b"));
        assert_eq!(
            reg.resolve(ApiType::Model, Some("whatever"), false, "").unwrap(),
            "https://res.openai.azure.com/openai/models?api-version=2022-12-01"
        );
        assert!(!reg.contains("b", ApiType::File));
    }

    #[test]
    fn lookup_by_name_precedes_alias() {
        // alias "x" -> name "y", alias "y" -> name "z": id "y" is a name first.
        let reg = registry(
            ManagedBackendSettings::new("res")
                .with_deployment("x", "y")
                .with_deployment("y", "z"),
        );
        assert_eq!(
            reg.resolve(ApiType::Edit, Some("y"), false, "").unwrap(),
            "https://res.openai.azure.com/openai/deployments/x/edits?api-version=2022-12-01"
        );
        assert_eq!(
            reg.resolve(ApiType::Edit, Some("z"), false, "").unwrap(),
            "https://res.openai.azure.com/openai/deployments/y/edits?api-version=2022-12-01"
        );
    }

    #[test]
    fn missing_id_uses_default_deployment() {
        let reg = registry(
            ManagedBackendSettings::new("res")
                .with_deployment("gpt4", "gpt-4")
                .with_default_deployment("gpt-4"),
        );
        assert_eq!(
            reg.resolve(ApiType::Chat, None, false, "").unwrap(),
            "https://res.openai.azure.com/openai/deployments/gpt4/chat/completions?api-version=2022-12-01"
        );
        assert_eq!(
            reg.resolve(ApiType::Chat, None, true, "").unwrap(),
            "https://res.openai.azure.com/openai/deployments/gpt-4/chat/completions?api-version=2022-12-01"
        );
    }

    #[test]
    fn missing_id_without_default_is_unregistered() {
        let reg = registry(ManagedBackendSettings::new("res").with_deployment("a", "b"));
        assert!(matches!(
            reg.resolve(ApiType::Chat, None, false, ""),
            Err(EndpointError::UnregisteredDeployment { .. })
        ));
    }

    #[test]
    fn forced_without_id_or_default_uses_first_alias() {
        let reg = registry(
            ManagedBackendSettings::new("res")
                .with_deployment("gpt4", "gpt4-deploy")
                .with_deployment("ada", "ada-deploy"),
        );
        for t in ApiType::deployment_scoped() {
            assert_eq!(
                reg.resolve(t, None, true, "").unwrap(),
                format!(
                    "https://res.openai.azure.com/openai/deployments/gpt4/{}?api-version=2022-12-01",
                    t.path()
                )
            );
        }
    }

    #[test]
    fn forced_with_only_placeholder_uses_its_name() {
        let reg = registry(
            ManagedBackendSettings::new("res").with_deployment(DEFAULT_DEPLOYMENT_ALIAS, "Fallback"),
        );
        assert_eq!(
            reg.resolve(ApiType::Embedding, None, true, "").unwrap(),
            "https://res.openai.azure.com/openai/deployments/Fallback/embeddings?api-version=2022-12-01"
        );
    }
}
