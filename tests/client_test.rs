//! Payment Highway REST client against a mock vendor

use chrono::{TimeZone, Utc};
use payment_highway_gateway::error::GatewayError;
use payment_highway_gateway::payments::response::VendorResponse;
use payment_highway_gateway::payments::signer::SecureSigner;
use payment_highway_gateway::payments::stamp::{FixedStamp, RequestStamp};
use payment_highway_gateway::payments::types::{CvcRequired, DebitRequest};
use payment_highway_gateway::payments::{PaymentApi, PaymentHighwayClient, PaymentHighwayConfig};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REQUEST_ID: &str = "f47ac10b-58cc-4372-a567-0e02b2c3d479";

fn client(server: &MockServer) -> PaymentHighwayClient {
    let config = PaymentHighwayConfig {
        api_key_id: "testKey".to_string(),
        api_key_secret: "testSecret".to_string(),
        sph_account: "test".to_string(),
        sph_merchant: "test_merchantId".to_string(),
        sph_url: server.uri(),
        timeout_secs: 5,
        ..Default::default()
    };
    let stamp = RequestStamp::at(
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
        REQUEST_ID,
    );
    PaymentHighwayClient::with_stamp_source(config, Arc::new(FixedStamp(stamp))).unwrap()
}

fn result(code: i64, message: &str) -> serde_json::Value {
    json!({ "result": { "code": code, "message": message } })
}

#[tokio::test]
async fn test_init_transaction_sends_signed_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction"))
        .and(header("sph-account", "test"))
        .and(header("sph-merchant", "test_merchantId"))
        .and(header("sph-timestamp", "2026-10-19T12:00:00Z"))
        .and(header("sph-request-id", REQUEST_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "tx-002",
            "result": { "code": 100, "message": "OK" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server).init_transaction().await.unwrap();
    match response {
        VendorResponse::Success(payload) => {
            assert_eq!(payload.transaction_id.as_deref(), Some("tx-002"))
        }
        other => panic!("unexpected response {:?}", other),
    }

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    let sph_headers: Vec<(String, String)> = request
        .headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("sph-"))
        .map(|(name, value)| (name.as_str().to_string(), value.to_str().unwrap().to_string()))
        .collect();
    let expected = SecureSigner::new("testKey", "testSecret").sign(
        "POST",
        "/transaction",
        sph_headers,
        "",
    );
    assert_eq!(
        request.headers.get("authorization").unwrap().to_str().unwrap(),
        expected
    );
}

#[tokio::test]
async fn test_debit_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/tx-002/debit"))
        .and(body_json(json!({
            "token": { "id": "tok-1" },
            "amount": 1999,
            "currency": "EUR",
            "blocking": true,
            "order": "42"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(result(100, "OK")))
        .expect(1)
        .mount(&server)
        .await;

    let request = DebitRequest::new("tok-1", 1999, "EUR", "42");
    let response = client(&server)
        .debit_transaction("tx-002", &request)
        .await
        .unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_commit_returns_card() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/tx-001/commit"))
        .and(body_json(json!({ "amount": 1999, "currency": "EUR" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "card_token": "tok-1",
            "card": {
                "type": "Visa",
                "partial_pan": "0024",
                "expire_month": "11",
                "expire_year": "2030",
                "cvc_required": "no"
            },
            "result": { "code": 100, "message": "OK" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client(&server)
        .commit_form_transaction("tx-001", 1999, "EUR")
        .await
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(payload.card_token.as_deref(), Some("tok-1"));
    assert_eq!(payload.card.unwrap().cvc_required, CvcRequired::No);
}

#[tokio::test]
async fn test_rejection_is_a_response_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/tx-001/commit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(result(200, "declined")))
        .mount(&server)
        .await;

    let response = client(&server)
        .commit_form_transaction("tx-001", 1999, "EUR")
        .await
        .unwrap();
    assert_eq!(response, VendorResponse::rejected(200, "declined"));
}

#[tokio::test]
async fn test_revert_amounts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/tx-001/revert"))
        .and(body_json(json!({ "amount": 500 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(result(100, "OK")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/transaction/tx-009/revert"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(result(100, "OK")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client
        .revert_transaction("tx-001", Some(500))
        .await
        .unwrap()
        .is_success());
    assert!(client
        .revert_transaction("tx-009", None)
        .await
        .unwrap()
        .is_success());
}

#[tokio::test]
async fn test_tokenize_is_a_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tokenization/tkn-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(result(100, "OK")))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client(&server).tokenize("tkn-9").await.unwrap().is_success());
}

#[tokio::test]
async fn test_server_error_is_unreachable_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/tx-001/commit"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .commit_form_transaction("tx-001", 1999, "EUR")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::VendorUnreachable { .. }));
}

#[tokio::test]
async fn test_garbage_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tokenization/tkn-9"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server).tokenize("tkn-9").await.unwrap_err();
    assert!(matches!(err, GatewayError::MalformedResponse { .. }));
}
