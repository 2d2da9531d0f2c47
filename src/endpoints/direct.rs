//! Endpoint table of the direct hosted API.

use super::uri::EndpointUri;
use crate::error::{EndpointError, Result};
use crate::types::ApiType;
use crate::version::VersionResolver;
use std::collections::HashMap;

pub const DIRECT_HOST: &str = "https://api.openai.com";

/// One template per [`ApiType`], built once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectEndpoints {
    templates: HashMap<ApiType, EndpointUri>,
}

impl DirectEndpoints {
    /// Build one template per type, versioned with `versions`.
    pub fn build(versions: &VersionResolver) -> Self {
        let templates = ApiType::ALL
            .into_iter()
            .map(|api_type| {
                let uri = match api_type {
                    // The usage dashboard lives outside the versioned API.
                    ApiType::Billing => EndpointUri::plain(DIRECT_HOST, api_type.path()),
                    _ => EndpointUri::plain(
                        format!("{DIRECT_HOST}/{}", versions.resolve(api_type)),
                        api_type.path(),
                    ),
                };
                (api_type, uri)
            })
            .collect();
        Self { templates }
    }

    /// The model/deployment id plays no part on this backend.
    pub fn resolve(&self, api_type: ApiType, suffix: &str) -> Result<String> {
        self.templates
            .get(&api_type)
            .ok_or_else(|| {
                EndpointError::ConfigurationError(format!("no direct endpoint for {api_type}"))
            })?
            .render(None, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::config::Settings;

    #[test]
    fn every_type_has_a_template() {
        let endpoints =
            DirectEndpoints::build(&VersionResolver::new(&Settings::new(), Backend::Direct));
        for api_type in ApiType::ALL {
            let uri = endpoints.resolve(api_type, "").unwrap();
            assert!(uri.starts_with("https://api.openai.com/"), "{uri}");
            assert!(uri.ends_with(api_type.path()), "{uri}");
        }
    }

    #[test]
    fn billing_is_unversioned() {
        let settings = Settings::new().with_type_version(ApiType::Billing, "v9");
        let endpoints = DirectEndpoints::build(&VersionResolver::new(&settings, Backend::Direct));
        assert_eq!(
            endpoints.resolve(ApiType::Billing, "?start_date=2023-01-01").unwrap(),
            "https://api.openai.com/dashboard/billing/usage?start_date=2023-01-01"
        );
    }
}
