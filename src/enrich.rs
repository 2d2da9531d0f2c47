//! Request enrichment.
//!
//! Stamps outgoing requests with `Authorization: Bearer <token>` when the
//! configuration carries a credential flow. Without one every method is a
//! no-op that leaves the request untouched.

use crate::auth::CredentialFlow;
use crate::error::{EndpointError, Result};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::sync::Arc;

/// Attaches bearer tokens from a [`CredentialFlow`] to outgoing requests.
#[derive(Debug, Clone)]
pub struct RequestEnricher {
    flow: Arc<CredentialFlow>,
}

impl RequestEnricher {
    /// Bind an enricher to a credential flow.
    pub fn new(flow: CredentialFlow) -> Self {
        Self {
            flow: Arc::new(flow),
        }
    }

    /// An enricher that never touches a request.
    pub fn disabled() -> Self {
        Self::new(CredentialFlow::None)
    }

    /// Whether [`enrich`](Self::enrich) does anything. Callers may skip it when false.
    pub fn needs_enrichment(&self) -> bool {
        self.flow.is_configured()
    }

    /// Insert the bearer header into `headers`.
    ///
    /// The header is written only after a token was acquired, so a failure
    /// leaves `headers` as it was.
    #[tracing::instrument(skip_all)]
    pub async fn enrich_headers(&self, headers: &mut HeaderMap) -> Result<()> {
        let Some(token) = self.flow.acquire_token().await? else {
            return Ok(());
        };
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.secret()))
            .map_err(|e| EndpointError::InvalidHeader(format!("bearer token: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        tracing::trace!(expires_on = %token.expires_on(), "authorization header attached");
        Ok(())
    }

    /// Insert the bearer header into a built request.
    pub async fn enrich(&self, request: &mut reqwest::Request) -> Result<()> {
        self.enrich_headers(request.headers_mut()).await
    }

    /// Build-time variant for callers holding a [`reqwest::RequestBuilder`].
    pub async fn apply(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        let mut headers = HeaderMap::new();
        self.enrich_headers(&mut headers).await?;
        Ok(builder.headers(headers))
    }
}

impl Default for RequestEnricher {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;

    #[tokio::test]
    async fn disabled_enricher_leaves_headers_alone() {
        let enricher = RequestEnricher::disabled();
        assert!(!enricher.needs_enrichment());

        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("1"));
        let before = headers.clone();
        enricher.enrich_headers(&mut headers).await.unwrap();
        assert_eq!(headers, before);
    }

    #[tokio::test]
    async fn custom_flow_sets_bearer() {
        let enricher = RequestEnricher::new(CredentialFlow::Custom(Arc::new(
            StaticTokenProvider::new("abc"),
        )));
        assert!(enricher.needs_enrichment());

        let mut headers = HeaderMap::new();
        enricher.enrich_headers(&mut headers).await.unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[tokio::test]
    async fn unrepresentable_token_is_rejected() {
        let enricher = RequestEnricher::new(CredentialFlow::Custom(Arc::new(
            StaticTokenProvider::new("bad\ntoken"),
        )));
        let mut headers = HeaderMap::new();
        let err = enricher.enrich_headers(&mut headers).await.unwrap_err();
        assert!(matches!(err, EndpointError::InvalidHeader(_)));
        assert!(headers.is_empty());
    }
}
