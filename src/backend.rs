//! Backend selection.

use crate::config::Settings;

/// Default version of the direct hosted API.
pub const DIRECT_DEFAULT_VERSION: &str = "v1";
/// Default version of the managed deployment backend.
pub const MANAGED_DEFAULT_VERSION: &str = "2022-12-01";

/// Which backend topology a configuration talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Single hosted API behind `https://api.openai.com`.
    Direct,
    /// Per-resource, per-deployment managed backend.
    Managed,
}

impl Backend {
    /// The managed backend is active iff the settings carry a managed block
    /// with a resource name and at least one deployment mapping.
    pub fn select(settings: &Settings) -> Self {
        match &settings.managed {
            Some(managed) if managed.has_configuration() => Backend::Managed,
            _ => Backend::Direct,
        }
    }

    /// Version used when the settings name none.
    pub const fn default_version(self) -> &'static str {
        match self {
            Backend::Direct => DIRECT_DEFAULT_VERSION,
            Backend::Managed => MANAGED_DEFAULT_VERSION,
        }
    }
}
