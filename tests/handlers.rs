use std::sync::Arc;
use std::time::Duration;

use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use serde_json::json;

use hearth_relay::error::RelayError;
use hearth_relay::handlers::registration::RegistrationHandler;
use hearth_relay::handlers::rest::RestHandler;
use hearth_relay::handlers::service::ServiceHandler;
use hearth_relay::handlers::states::StatesHandler;
use hearth_relay::handlers::webhook::WebhookHandler;
use hearth_relay::interfaces::handlers::Handler;
use hearth_relay::local_api::LocalApi;

fn api(server: &MockServer) -> Arc<LocalApi> {
    Arc::new(LocalApi::new(server.base_url(), "secret-token", Duration::from_secs(5)).unwrap())
}

#[tokio::test]
async fn rest_get_sends_bearer_and_query() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/states")
                .header("authorization", "Bearer secret-token")
                .query_param("filter", "on");
            then.status(200)
                .json_body(json!([{"entity_id": "light.kitchen", "state": "on"}]));
        })
        .await;

    let handler = RestHandler::new(api(&server));
    let result = handler
        .handle(json!({"method": "get", "path": "/api/states", "data": {"filter": "on"}}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result[0]["state"], "on");
    mock.assert_async().await;
}

#[tokio::test]
async fn rest_post_sends_json_body() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/events/custom")
                .header("authorization", "Bearer secret-token")
                .json_body(json!({"source": "relay"}));
            then.status(200).json_body(json!({"message": "Event custom fired."}));
        })
        .await;

    let handler = RestHandler::new(api(&server));
    let result = handler
        .handle(json!({"method": "post", "path": "/api/events/custom", "data": {"source": "relay"}}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result["message"], "Event custom fired.");
    mock.assert_async().await;
}

#[tokio::test]
async fn rest_honors_absolute_url() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/elsewhere");
            then.status(200).json_body(json!({"ok": true}));
        })
        .await;

    let handler = RestHandler::new(api(&server));
    let url = server.url("/elsewhere");
    let result = handler
        .handle(json!({"method": "get", "url": url, "data": {}}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result["ok"], true);
    mock.assert_async().await;
}

#[tokio::test]
async fn rest_rejects_unsupported_method() {
    let server = MockServer::start_async().await;
    let handler = RestHandler::new(api(&server));
    let err = handler
        .handle(json!({"method": "delete", "path": "/api/states", "data": {}}))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Runtime(_)));
}

#[tokio::test]
async fn rest_maps_http_failures() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/states");
            then.status(500).body("upstream broke");
        })
        .await;

    let handler = RestHandler::new(api(&server));
    let err = handler
        .handle(json!({"method": "get", "path": "/api/states", "data": {}}))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Http(_)));
    assert!(format!("{err}").contains("500"));
}

#[tokio::test]
async fn webhook_posts_payload_and_forwards_body() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/webhook/abc123")
                .header("authorization", "Bearer secret-token")
                .json_body(json!({"type": "update_location"}));
            then.status(200).json_body(json!({"received": true}));
        })
        .await;

    let handler = WebhookHandler::new(api(&server));
    let result = handler
        .handle(json!({"webhook_id": "abc123", "data": {"type": "update_location"}}))
        .await
        .unwrap();
    assert_eq!(result.unwrap()["received"], true);
    mock.assert_async().await;
}

#[tokio::test]
async fn webhook_empty_body_yields_no_result() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/webhook/abc123");
            then.status(200);
        })
        .await;

    let handler = WebhookHandler::new(api(&server));
    let result = handler
        .handle(json!({"webhook_id": "abc123", "data": {}}))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn webhook_requires_an_id() {
    let server = MockServer::start_async().await;
    let handler = WebhookHandler::new(api(&server));
    let err = handler.handle(json!({"data": {}})).await.unwrap_err();
    assert!(matches!(err, RelayError::Runtime(_)));
}

#[tokio::test]
async fn registration_posts_to_the_fixed_endpoint() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/mobile_app/registrations")
                .json_body(json!({"device_name": "phone"}));
            then.status(201)
                .json_body(json!({"webhook_id": "abc123", "secret": "s"}));
        })
        .await;

    let handler = RegistrationHandler::new(api(&server));
    let result = handler
        .handle(json!({"data": {"device_name": "phone"}}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result["webhook_id"], "abc123");
    mock.assert_async().await;
}

#[tokio::test]
async fn service_invocation_hits_the_service_path() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/services/light/turn_on")
                .json_body(json!({"entity_id": "light.kitchen"}));
            then.status(200)
                .json_body(json!([{"entity_id": "light.kitchen", "state": "on"}]));
        })
        .await;

    let handler = ServiceHandler::new(api(&server));
    let result = handler
        .handle(json!({"domain": "light", "service": "turn_on", "data": {"entity_id": "light.kitchen"}}))
        .await
        .unwrap();
    assert_eq!(result.unwrap()[0]["state"], "on");
    mock.assert_async().await;
}

#[tokio::test]
async fn service_invocation_requires_domain_and_service() {
    let server = MockServer::start_async().await;
    let handler = ServiceHandler::new(api(&server));
    assert!(handler.handle(json!({"service": "turn_on"})).await.is_err());
    assert!(handler.handle(json!({"domain": "light"})).await.is_err());
}

#[tokio::test]
async fn states_snapshot_returns_the_full_dump() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/states")
                .header("authorization", "Bearer secret-token");
            then.status(200).json_body(json!([
                {"entity_id": "light.kitchen", "state": "on"},
                {"entity_id": "sensor.door", "state": "closed"}
            ]));
        })
        .await;

    let handler = StatesHandler::new(api(&server));
    let result = handler.handle(json!({})).await.unwrap().unwrap();
    assert_eq!(result.as_array().unwrap().len(), 2);
    mock.assert_async().await;
}
