//! Explicit URI builder.
//!
//! An [`EndpointUri`] holds the pieces of one endpoint (base, optional
//! deployment segment, path, optional `api-version`) and renders them with the
//! caller's suffix.

use crate::error::{EndpointError, Result};

/// Deployment segment of a managed, deployment-scoped endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentSegment {
    /// A configured alias.
    Fixed(String),
    /// Filled with the id the caller asked for (the `"{0}"` placeholder alias).
    FromRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointUri {
    base: String,
    deployment: Option<DeploymentSegment>,
    path: &'static str,
    api_version: Option<String>,
}

impl EndpointUri {
    /// `{base}/{path}`, unversioned query.
    pub fn plain(base: impl Into<String>, path: &'static str) -> Self {
        Self {
            base: base.into(),
            deployment: None,
            path,
            api_version: None,
        }
    }

    /// `{base}/{path}?api-version={version}`
    pub fn versioned(base: impl Into<String>, path: &'static str, version: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            deployment: None,
            path,
            api_version: Some(version.into()),
        }
    }

    /// `{base}/deployments/{segment}/{path}?api-version={version}`
    pub fn deployment(
        base: impl Into<String>,
        segment: DeploymentSegment,
        path: &'static str,
        version: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into(),
            deployment: Some(segment),
            path,
            api_version: Some(version.into()),
        }
    }

    /// Render the URI.
    ///
    /// `requested` fills a [`DeploymentSegment::FromRequest`] segment. The
    /// suffix is inserted between the path and the `api-version` query; a
    /// suffix starting with `?` is merged into that query instead.
    pub fn render(&self, requested: Option<&str>, suffix: &str) -> Result<String> {
        let mut uri = self.base.clone();

        match &self.deployment {
            None => {}
            Some(DeploymentSegment::Fixed(alias)) => {
                uri.push_str("/deployments/");
                uri.push_str(&urlencoding::encode(alias));
            }
            Some(DeploymentSegment::FromRequest) => {
                let id = requested.filter(|id| !id.trim().is_empty()).ok_or_else(|| {
                    EndpointError::ConfigurationError(format!(
                        "{} needs a model or deployment id to fill the default deployment",
                        self.path
                    ))
                })?;
                uri.push_str("/deployments/");
                uri.push_str(&urlencoding::encode(id));
            }
        }

        uri.push('/');
        uri.push_str(self.path);

        match &self.api_version {
            None => uri.push_str(suffix),
            Some(version) => match suffix.strip_prefix('?') {
                Some(query) => {
                    uri.push_str("?api-version=");
                    uri.push_str(version);
                    if !query.is_empty() {
                        uri.push('&');
                        uri.push_str(query);
                    }
                }
                None => {
                    uri.push_str(suffix);
                    uri.push_str("?api-version=");
                    uri.push_str(version);
                }
            },
        }

        Ok(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_appends_suffix_verbatim() {
        let uri = EndpointUri::plain("https://api.openai.com/v1", "files");
        assert_eq!(
            uri.render(None, "/file-1/content").unwrap(),
            "https://api.openai.com/v1/files/file-1/content"
        );
        assert_eq!(
            uri.render(None, "?limit=2").unwrap(),
            "https://api.openai.com/v1/files?limit=2"
        );
    }

    #[test]
    fn versioned_inserts_path_suffix_before_query() {
        let uri = EndpointUri::versioned("https://r.openai.azure.com/openai", "files", "2022-12-01");
        assert_eq!(
            uri.render(None, "/file-1").unwrap(),
            "https://r.openai.azure.com/openai/files/file-1?api-version=2022-12-01"
        );
    }

    #[test]
    fn versioned_merges_query_suffix() {
        let uri = EndpointUri::versioned("https://r.openai.azure.com/openai", "fine-tunes", "v");
        assert_eq!(
            uri.render(None, "?after=ft-1&limit=5").unwrap(),
            "https://r.openai.azure.com/openai/fine-tunes?api-version=v&after=ft-1&limit=5"
        );
        assert_eq!(
            uri.render(None, "?").unwrap(),
            "https://r.openai.azure.com/openai/fine-tunes?api-version=v"
        );
    }

    #[test]
    fn placeholder_segment_requires_an_id() {
        let uri = EndpointUri::deployment(
            "https://r.openai.azure.com/openai",
            DeploymentSegment::FromRequest,
            "embeddings",
            "v",
        );
        assert_eq!(
            uri.render(Some("ada"), "").unwrap(),
            "https://r.openai.azure.com/openai/deployments/ada/embeddings?api-version=v"
        );
        assert!(uri.render(None, "").is_err());
        assert!(uri.render(Some(" "), "").is_err());
    }

    #[test]
    fn segments_are_percent_encoded() {
        let uri = EndpointUri::deployment(
            "https://r.openai.azure.com/openai",
            DeploymentSegment::Fixed("my model".into()),
            "chat/completions",
            "v",
        );
        assert_eq!(
            uri.render(None, "").unwrap(),
            "https://r.openai.azure.com/openai/deployments/my%20model/chat/completions?api-version=v"
        );
    }
}
