use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use salon_api::config::PesapalConfig;
use salon_api::errors::ServiceError;
use salon_api::gateway::{GatewayOrderRequest, PaymentGateway, PesapalClient};

fn client_for(server: &MockServer) -> PesapalClient {
    PesapalClient::new(PesapalConfig {
        consumer_key: "test-key".to_string(),
        consumer_secret: "test-secret".to_string(),
        base_url: server.uri(),
        callback_url: "http://localhost:8080/api/v1/payments/callback".to_string(),
        ipn_url: "http://localhost:8080/api/v1/payments/ipn".to_string(),
        currency: "KES".to_string(),
    })
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/Auth/RequestToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "jwt-token-abc",
            "expiryDate": (Utc::now() + Duration::hours(1)).to_rfc3339(),
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn token_and_ipn_registration_are_cached() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/URLSetup/RegisterIPN"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ipn_id": "ipn-42" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.register_ipn().await.unwrap(), "ipn-42");
    // Second call hits neither endpoint.
    assert_eq!(client.register_ipn().await.unwrap(), "ipn-42");
}

#[tokio::test]
async fn status_query_carries_code_and_raw_body() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/Transactions/GetTransactionStatus"))
        .and(query_param("orderTrackingId", "track-99"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "payment_method": "MPESA",
            "amount": 1500.0,
            "status_code": 1,
            "payment_status_description": "Completed",
            "currency": "KES",
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let status = client.transaction_status("track-99").await.unwrap();

    assert_eq!(status.payment_status_code, "1");
    assert_eq!(status.payment_method.as_deref(), Some("MPESA"));
    assert_eq!(status.amount, dec!(1500));
    assert_eq!(status.currency, "KES");
    assert_eq!(status.raw["payment_status_description"], "Completed");
}

#[tokio::test]
async fn rejected_credentials_surface_as_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/Auth/RequestToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": null,
            "error": {
                "code": "invalid_consumer_key_or_secret",
                "message": "Invalid Access Token generation details",
            },
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.register_ipn().await.unwrap_err();
    assert!(matches!(err, ServiceError::GatewayError(_)), "{err:?}");
}

#[tokio::test]
async fn submission_rejection_surfaces_as_gateway_error() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/URLSetup/RegisterIPN"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ipn_id": "ipn-42" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/Transactions/SubmitOrderRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "code": "invalid_currency", "message": "Currency not supported" },
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .submit_order(&GatewayOrderRequest {
            merchant_reference: "ref-1".to_string(),
            amount: dec!(100),
            currency: "XXX".to_string(),
            description: "Test".to_string(),
            callback_url: "http://localhost/cb".to_string(),
            billing_email: "a@b.co".to_string(),
            billing_phone: None,
            billing_name: Some("Achieng Odhiambo".to_string()),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::GatewayError(_)), "{err:?}");
}
