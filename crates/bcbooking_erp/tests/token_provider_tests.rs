
use bcbooking_erp::{ErpError, FileTokenStore, MemoryTokenStore, TokenProvider, TokenStore};
use fixtures::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_valid_cached_token_skips_issuer() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "never-issued", 0).await;

    let store = memory_store_with(valid_token("cached-token")).await;
    let provider = create_provider(&server.uri(), store);

    assert_eq!(provider.get_token().await.unwrap(), "cached-token");
    assert_eq!(provider.get_token().await.unwrap(), "cached-token");
}

#[tokio::test]
async fn test_expired_token_triggers_one_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh-token")))
        .expect(1)
        .mount(&server)
        .await;

    let store = memory_store_with(expired_token("old-token")).await;
    let provider = create_provider(&server.uri(), store.clone());

    assert_eq!(provider.get_token().await.unwrap(), "fresh-token");
    // Second call is served from the cache
    assert_eq!(provider.get_token().await.unwrap(), "fresh-token");

    let cached = store.load().await.unwrap();
    let now = chrono::Utc::now().timestamp_millis();
    assert_eq!(cached.access_token, "fresh-token");
    assert!(cached.expires_at > now + 3_400_000);
    assert!(cached.expires_at <= now + 3_599_000 - 60_000);
}

#[tokio::test]
async fn test_grant_form_fields() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "fresh-token", 1).await;

    let provider = create_provider(&server.uri(), Arc::new(MemoryTokenStore::default()));
    provider.get_token().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let form: HashMap<String, String> = serde_urlencoded::from_bytes(&requests[0].body).unwrap();
    assert_eq!(form["grant_type"], "client_credentials");
    assert_eq!(form["client_id"], "test-client");
    assert_eq!(form["client_secret"], "test-secret");
    assert_eq!(
        form["scope"],
        "https://api.businesscentral.dynamics.com/.default"
    );
}

#[tokio::test]
async fn test_missing_expires_in_uses_fallback_lifetime() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::default());
    let provider = TokenProvider::new(
        reqwest::Client::new(),
        create_erp_config(&server.uri()),
        store.clone(),
        600,
    );
    provider.get_token().await.unwrap();

    let expires_at = store.load().await.unwrap().expires_at;
    let now = chrono::Utc::now().timestamp_millis();
    assert!(expires_at > now + 500_000);
    assert!(expires_at <= now + 540_000);
}

#[tokio::test]
async fn test_missing_credentials_fail_before_any_request() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "never-issued", 0).await;

    let mut config = create_erp_config(&server.uri());
    config.tenant_id = None;
    let provider = TokenProvider::new(
        reqwest::Client::new(),
        config,
        memory_store_with(valid_token("cached-token")).await,
        3600,
    );

    match provider.get_token().await {
        Err(ErpError::MissingConfig(name)) => assert_eq!(name, "tenant_id"),
        other => panic!("expected MissingConfig, got {:?}", other),
    }
}

#[tokio::test]
async fn test_issuer_rejection_is_reported_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_client"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = create_provider(&server.uri(), Arc::new(MemoryTokenStore::default()));
    match provider.get_token().await {
        Err(ErpError::TokenEndpoint { status, body }) => {
            assert_eq!(status, 400);
            assert_eq!(body, "invalid_client");
        }
        other => panic!("expected TokenEndpoint, got {:?}", other),
    }
}

#[tokio::test]
async fn test_payload_without_token_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"expires_in": 3599})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::default());
    let provider = create_provider(&server.uri(), store.clone());

    assert!(matches!(
        provider.get_token().await,
        Err(ErpError::InvalidTokenResponse)
    ));
    assert!(store.load().await.is_none());
}

#[tokio::test]
async fn test_concurrent_callers_share_one_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("shared-token"))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(create_provider(
        &server.uri(),
        Arc::new(MemoryTokenStore::default()),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let provider = provider.clone();
            tokio::spawn(async move { provider.get_token().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "shared-token");
    }
}

#[tokio::test]
async fn test_refresh_bypasses_unexpired_cache() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "replacement", 1).await;

    let store = memory_store_with(valid_token("rejected")).await;
    let provider = create_provider(&server.uri(), store);

    assert_eq!(provider.refresh_token("rejected").await.unwrap(), "replacement");
}

#[tokio::test]
async fn test_refresh_reuses_token_replaced_concurrently() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "never-issued", 0).await;

    let store = memory_store_with(valid_token("newer")).await;
    let provider = create_provider(&server.uri(), store);

    assert_eq!(provider.refresh_token("rejected").await.unwrap(), "newer");
}

#[tokio::test]
async fn test_file_cache_survives_provider_restart() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "persisted", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("cache").join("token_cache.json");

    let first = create_provider(&server.uri(), Arc::new(FileTokenStore::new(&cache_path)));
    assert_eq!(first.get_token().await.unwrap(), "persisted");

    let second = create_provider(&server.uri(), Arc::new(FileTokenStore::new(&cache_path)));
    assert_eq!(second.get_token().await.unwrap(), "persisted");

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&cache_path).unwrap()).unwrap();
    assert_eq!(raw["access_token"], "persisted");
    assert!(raw["expires_at"].is_i64());
}
