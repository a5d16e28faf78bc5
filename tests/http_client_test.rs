use chrono::{TimeZone, Utc};
use elmah_io_forwarder::domain::{Item, OutboundRecord, Severity};
use elmah_io_forwarder::sender::{ClientConfig, ClientError, DeliveryClient, HttpClient, Installation};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path, query_param},
};

const LOG_ID: &str = "8d8c8f0e-5a9b-4c7e-9f6a-2b3c4d5e6f70";

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::new(ClientConfig {
        base_url: server.uri(),
        api_key: "test-key".to_string(),
        timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap()
}

fn sample(title: &str) -> OutboundRecord {
    let mut record = OutboundRecord::new(
        title,
        Severity::Error,
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    );
    record.url = Some("/checkout".to_string());
    record.status_code = Some(500);
    record.data = vec![Item::new("orderId", Some("42".to_string()))];
    record
}

#[tokio::test]
async fn test_single_message_posts_to_messages_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/v3/messages/{}", LOG_ID)))
        .and(query_param("api_key", "test-key"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "title": "Checkout failed",
            "severity": "Error",
            "url": "/checkout",
            "statusCode": 500,
            "data": [{"key": "orderId", "value": "42"}]
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.create_one(LOG_ID, &sample("Checkout failed")).await.unwrap();

    let stats = client.connection_stats();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.successful_requests, 1);
}

#[tokio::test]
async fn test_bulk_posts_array_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/v3/messages/{}/_bulk", LOG_ID)))
        .and(query_param("api_key", "test-key"))
        .and(body_partial_json(json!([
            {"title": "first"},
            {"title": "second"}
        ])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .create_bulk(LOG_ID, &[sample("first"), sample("second")])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_installation_carries_log_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/installations/_create"))
        .and(body_partial_json(json!({
            "logId": LOG_ID,
            "name": "shop",
            "type": "rust"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .create_installation(LOG_ID, &Installation::current(Some("shop")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_non_success_status_becomes_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.create_one(LOG_ID, &sample("denied")).await;

    match result {
        Err(ClientError::HttpError { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid api key");
        }
        other => panic!("Expected HttpError, got {:?}", other),
    }
    assert_eq!(client.connection_stats().failed_requests, 1);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = HttpClient::new(ClientConfig {
        base_url: server.uri(),
        api_key: "test-key".to_string(),
        timeout: Duration::from_millis(200),
        ..Default::default()
    })
    .unwrap();

    let result = client.create_one(LOG_ID, &sample("slow")).await;
    assert!(matches!(result, Err(ClientError::RequestTimeout(_))));
}
