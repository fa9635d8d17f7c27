
use bcbooking_erp::{ErpError, ErpGateway, MemoryTokenStore, TokenProvider};
use fixtures::*;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_gateway(server_uri: &str, tokens: TokenProvider) -> ErpGateway {
    ErpGateway::new(
        reqwest::Client::new(),
        create_erp_config(server_uri),
        Arc::new(tokens),
    )
}

#[tokio::test]
async fn test_setup_list_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SETUP_LIST_PATH))
        .and(query_param("Company", COMPANY))
        .and(header("authorization", "Bearer cached-token"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"Code": "ZRH", "Description": "Zurich"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = memory_store_with(valid_token("cached-token")).await;
    let gateway = create_gateway(&server.uri(), create_provider(&server.uri(), store));

    let records = gateway.fetch_setup_list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["Code"], "ZRH");
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_and_retried_once() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "fresh-token", 1).await;
    Mock::given(method("POST"))
        .and(path(SETUP_LIST_PATH))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SETUP_LIST_PATH))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"Code": "A1"}, {"Code": "B2"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = memory_store_with(valid_token("stale-token")).await;
    let gateway = create_gateway(&server.uri(), create_provider(&server.uri(), store));

    let records = gateway.fetch_setup_list().await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_forbidden_also_triggers_refresh() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "fresh-token", 1).await;
    Mock::given(method("POST"))
        .and(path(TIME_SLOTS_PATH))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TIME_SLOTS_PATH))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"slots": []})))
        .expect(1)
        .mount(&server)
        .await;

    let store = memory_store_with(valid_token("stale-token")).await;
    let gateway = create_gateway(&server.uri(), create_provider(&server.uri(), store));

    let slots = gateway
        .fetch_time_slots(&json!({"date": "2025-05-15"}))
        .await
        .unwrap();
    assert_eq!(slots, json!({"slots": []}));
}

#[tokio::test]
async fn test_second_rejection_is_fatal() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "fresh-token", 1).await;
    Mock::given(method("POST"))
        .and(path(SETUP_LIST_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("token rejected"))
        .expect(2)
        .mount(&server)
        .await;

    let store = memory_store_with(valid_token("stale-token")).await;
    let gateway = create_gateway(&server.uri(), create_provider(&server.uri(), store));

    match gateway.fetch_setup_list().await {
        Err(ErpError::Unauthorized { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "token rejected");
        }
        other => panic!("expected Unauthorized, got {:?}", other),
    }
}

#[tokio::test]
async fn test_double_encoded_value_is_unwrapped() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "fresh-token", 1).await;
    Mock::given(method("POST"))
        .and(path(SETUP_LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@odata.context": "https://example/$metadata#Edm.String",
            "value": "[{\"Code\":\"A1\",\"Location\":\"Basel\"}]"
        })))
        .mount(&server)
        .await;

    let provider = create_provider(&server.uri(), Arc::new(MemoryTokenStore::default()));
    let gateway = create_gateway(&server.uri(), provider);

    let records = gateway.fetch_setup_list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["Location"], "Basel");
}

#[tokio::test]
async fn test_malformed_value_degrades_to_empty() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "fresh-token", 1).await;
    Mock::given(method("POST"))
        .and(path(SETUP_LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": "not json"})))
        .mount(&server)
        .await;

    let provider = create_provider(&server.uri(), Arc::new(MemoryTokenStore::default()));
    let gateway = create_gateway(&server.uri(), provider);

    assert!(gateway.fetch_setup_list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upstream_failure_echoes_body() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "fresh-token", 1).await;
    Mock::given(method("POST"))
        .and(path(SETUP_LIST_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("codeunit error"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = create_provider(&server.uri(), Arc::new(MemoryTokenStore::default()));
    let gateway = create_gateway(&server.uri(), provider);

    match gateway.fetch_setup_list().await {
        Err(ErpError::Upstream { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "codeunit error");
        }
        other => panic!("expected Upstream, got {:?}", other),
    }
}

#[tokio::test]
async fn test_branch_setup_sends_setup_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SETUP_PATH))
        .and(body_json(json!({"_BookingSetupCode": "ZRH"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": "{}"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = memory_store_with(valid_token("cached-token")).await;
    let gateway = create_gateway(&server.uri(), create_provider(&server.uri(), store));

    let setup: Value = gateway.fetch_branch_setup("ZRH").await.unwrap();
    assert_eq!(setup, json!({"value": "{}"}));
}

#[tokio::test]
async fn test_time_slot_body_is_forwarded_unchanged() {
    let server = MockServer::start().await;
    let query = json!({"_BookingSetupCode": "ZRH", "_Date": "2025-05-15", "extra": [1, 2]});
    Mock::given(method("POST"))
        .and(path(TIME_SLOTS_PATH))
        .and(body_json(query.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": "[]"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = memory_store_with(valid_token("cached-token")).await;
    let gateway = create_gateway(&server.uri(), create_provider(&server.uri(), store));

    assert_eq!(
        gateway.fetch_time_slots(&query).await.unwrap(),
        json!({"value": "[]"})
    );
}
