//! Integration tests for the reqwest transport against a mock token service.

use std::sync::Arc;
use std::time::Duration;

use qr_token_client::{
    API_KEY_HEADER, ClientError, HttpTokenTransport, TokenClient, ValidationClient,
};
use qr_token_core::{
    MESSAGE_ACCESS_DENIED, MESSAGE_FAILED_TO_RETRIEVE, MESSAGE_NOT_FOUND, MESSAGE_RATE_LIMITED,
    MESSAGE_SERVER_ERROR, MESSAGE_UNKNOWN, TokenRequest,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, timeout: Duration) -> TokenClient {
    let transport = HttpTokenTransport::new(timeout).expect("transport should build");
    TokenClient::new(
        &format!("{}/prod", server.uri()),
        Some("secret-key".to_string()),
        Arc::new(transport),
    )
    .expect("client should build")
}

fn request() -> TokenRequest {
    TokenRequest::new("+15551234567", None).expect("valid request")
}

#[tokio::test]
async fn http_transport_tests_sends_identifier_and_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/prod/getToken"))
        .and(query_param("uniqueId", "+15551234567"))
        .and(header(API_KEY_HEADER, "secret-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"token": "abc123", "expiration": 1_700_000_300})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server, Duration::from_secs(5))
        .request_token(&request())
        .await
        .expect("token should be issued");

    assert_eq!(response.token, "abc123");
    assert_eq!(response.expires_at, 1_700_000_300);
}

#[tokio::test]
async fn http_transport_tests_maps_status_codes_to_fixed_messages() {
    let cases = [
        (403, MESSAGE_ACCESS_DENIED),
        (404, MESSAGE_NOT_FOUND),
        (429, MESSAGE_RATE_LIMITED),
        (500, MESSAGE_SERVER_ERROR),
        (502, MESSAGE_SERVER_ERROR),
        (400, MESSAGE_FAILED_TO_RETRIEVE),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prod/getToken"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let error = client_for(&server, Duration::from_secs(5))
            .request_token(&request())
            .await
            .expect_err("non-success status should fail");

        assert_eq!(error.status_code, status, "status for {status}");
        assert_eq!(error.message, expected, "message for {status}");
    }
}

#[tokio::test]
async fn http_transport_tests_timeout_defaults_to_500() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"token": "late", "expiration": 1}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let error = client_for(&server, Duration::from_millis(100))
        .request_token(&request())
        .await
        .expect_err("slow response should time out");

    assert_eq!(error.status_code, 500);
    assert_eq!(error.message, MESSAGE_FAILED_TO_RETRIEVE);
}

#[tokio::test]
async fn http_transport_tests_undecodable_body_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let error = client_for(&server, Duration::from_secs(5))
        .request_token(&request())
        .await
        .expect_err("html body should fail");

    assert_eq!(error.status_code, 500);
    assert_eq!(error.message, MESSAGE_UNKNOWN);
}

#[tokio::test]
async fn http_transport_tests_validation_posts_token_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prod/validateToken"))
        .and(header(API_KEY_HEADER, "secret-key"))
        .and(body_json(serde_json::json!({"token": "abc123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"valid": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ValidationClient::new(
        &server.uri(),
        "prod",
        "/validateToken",
        Some("secret-key".to_string()),
        Duration::from_secs(5),
    )
    .expect("validation client should build");

    let verdict = client.validate("abc123").await.expect("validation should succeed");
    assert_eq!(verdict["valid"], true);
}

#[tokio::test]
async fn http_transport_tests_validation_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = ValidationClient::new(
        &server.uri(),
        "prod",
        "/validateToken",
        None,
        Duration::from_secs(5),
    )
    .expect("validation client should build");

    assert!(matches!(
        client.validate("abc123").await,
        Err(ClientError::Status(401))
    ));
    assert!(matches!(
        client.validate("  ").await,
        Err(ClientError::EmptyToken)
    ));
}
