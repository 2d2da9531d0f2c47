//! Endpoint resolution.
//!
//! [`EndpointResolver`] is built once per configuration and is a pure lookup
//! afterwards, safe to share across threads without locking.

pub mod direct;
pub mod registry;
pub mod uri;

pub use direct::{DIRECT_HOST, DirectEndpoints};
pub use registry::{
    DEFAULT_DEPLOYMENT_ALIAS, DeploymentRegistry, FORCED_DEPLOYMENT, RouteKey, managed_base_url,
};
pub use uri::{DeploymentSegment, EndpointUri};

use crate::backend::Backend;
use crate::config::Settings;
use crate::error::{EndpointError, Result};
use crate::types::ApiType;
use crate::version::VersionResolver;

/// URI tables of the active backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointResolver {
    Direct(DirectEndpoints),
    Managed(DeploymentRegistry),
}

impl EndpointResolver {
    /// Build the tables for `backend`. The managed backend needs a managed block.
    pub fn build(settings: &Settings, backend: Backend, versions: &VersionResolver) -> Result<Self> {
        match backend {
            Backend::Direct => Ok(Self::Direct(DirectEndpoints::build(versions))),
            Backend::Managed => {
                let managed = settings.managed.as_ref().ok_or_else(|| {
                    EndpointError::ConfigurationError(
                        "managed backend selected without managed settings".to_string(),
                    )
                })?;
                Ok(Self::Managed(DeploymentRegistry::build(managed, versions)))
            }
        }
    }

    /// Resolve the absolute URI for `api_type`.
    ///
    /// `model_id` names a model or deployment (ignored on the direct backend
    /// and for resource-wide types). `force_default` routes through the
    /// default deployment. `suffix` is appended to the path (or merged into the
    /// query when it starts with `?`).
    pub fn resolve(
        &self,
        api_type: ApiType,
        model_id: Option<&str>,
        force_default: bool,
        suffix: &str,
    ) -> Result<String> {
        let uri = match self {
            Self::Direct(direct) => direct.resolve(api_type, suffix),
            Self::Managed(registry) => registry.resolve(api_type, model_id, force_default, suffix),
        };
        match &uri {
            Ok(uri) => tracing::trace!(%api_type, ?model_id, force_default, %uri, "resolved endpoint"),
            Err(e) => tracing::debug!(%api_type, ?model_id, force_default, error = %e, "endpoint resolution failed"),
        }
        uri
    }

    /// Backend the tables were built for.
    pub fn backend(&self) -> Backend {
        match self {
            Self::Direct(_) => Backend::Direct,
            Self::Managed(_) => Backend::Managed,
        }
    }
}
