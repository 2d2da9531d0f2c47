use openai_endpoints::auth::{AccessToken, StaticTokenProvider, TokenProvider};
use openai_endpoints::{
    ApiType, EndpointError, ManagedBackendSettings, OpenAiConfiguration, Result, Settings,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct FailingProvider;

#[async_trait::async_trait]
impl TokenProvider for FailingProvider {
    async fn token(&self) -> Result<AccessToken> {
        Err(EndpointError::AuthenticationError("identity unavailable".into()))
    }
}

/// Counts acquisitions and never caches.
struct CountingProvider {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl TokenProvider for CountingProvider {
    async fn token(&self) -> Result<AccessToken> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AccessToken::new(
            format!("token-{n}"),
            chrono::Utc::now() + chrono::Duration::hours(1),
        ))
    }
}

fn managed_settings() -> Settings {
    Settings::new().with_managed_backend(
        ManagedBackendSettings::new("res")
            .with_deployment("gpt4", "gpt-4")
            .with_managed_identity(None),
    )
}

#[tokio::test]
async fn direct_backend_never_touches_headers() {
    let config = OpenAiConfiguration::new(Settings::new()).unwrap();
    assert!(!config.needs_enrichment());

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer sk-user"));
    headers.insert("openai-organization", HeaderValue::from_static("org-1"));
    let before = headers.clone();

    config.enrich_headers(&mut headers).await.unwrap();
    assert_eq!(headers, before);

    let client = reqwest::Client::new();
    let uri = config.resolve(ApiType::Model, None, false, "").unwrap();
    let mut request = client.get(uri).build().unwrap();
    config.enrich(&mut request).await.unwrap();
    assert!(request.headers().is_empty());
}

#[tokio::test]
async fn static_provider_stamps_bearer() {
    let config = OpenAiConfiguration::builder(managed_settings())
        .token_provider(Arc::new(StaticTokenProvider::new("static")))
        .build()
        .unwrap();
    assert!(config.needs_enrichment());

    let mut headers = HeaderMap::new();
    config.enrich_headers(&mut headers).await.unwrap();
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer static");
}

#[tokio::test]
async fn enrichment_replaces_an_existing_authorization() {
    let config = OpenAiConfiguration::builder(managed_settings())
        .token_provider(Arc::new(StaticTokenProvider::new("fresh")))
        .build()
        .unwrap();

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
    config.enrich_headers(&mut headers).await.unwrap();
    assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
    assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer fresh");
}

#[tokio::test]
async fn failed_acquisition_propagates_and_leaves_no_header() {
    let config = OpenAiConfiguration::builder(managed_settings())
        .token_provider(Arc::new(FailingProvider))
        .build()
        .unwrap();

    let client = reqwest::Client::new();
    let uri = config.resolve(ApiType::Chat, Some("gpt-4"), false, "").unwrap();
    let mut request = client.post(uri).build().unwrap();

    let err = config.enrich(&mut request).await.unwrap_err();
    assert!(err.is_auth_error());
    assert!(request.headers().get(AUTHORIZATION).is_none());
}

#[tokio::test]
async fn every_enrichment_asks_the_provider() {
    let provider = Arc::new(CountingProvider {
        calls: AtomicUsize::new(0),
    });
    let config = OpenAiConfiguration::builder(managed_settings())
        .token_provider(provider.clone())
        .build()
        .unwrap();

    for expected in ["Bearer token-1", "Bearer token-2"] {
        let mut headers = HeaderMap::new();
        config.enrich_headers(&mut headers).await.unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), expected);
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn request_builder_helper_adds_header() {
    let config = OpenAiConfiguration::builder(managed_settings())
        .token_provider(Arc::new(StaticTokenProvider::new("built")))
        .build()
        .unwrap();

    let client = reqwest::Client::new();
    let uri = config.resolve(ApiType::Embedding, Some("gpt4"), false, "").unwrap();
    let request = config
        .enricher()
        .apply(client.post(uri))
        .await
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(request.headers().get(AUTHORIZATION).unwrap(), "Bearer built");
}
