//! Integration tests for the Twilio gateway.
//!
//! The mock-server tests run by default. The live tests make real API calls,
//! send real messages and are ignored by default.
//!
//! # Setup
//!
//! 1. Copy the example env file:
//!    ```bash
//!    cp tests/.env.example .env
//!    ```
//!
//! 2. Edit `.env` and add your Twilio credentials and a phone number you
//!    control in `TWILIO_TEST_DESTINATION`
//!
//! 3. Run the tests:
//!    ```bash
//!    cargo test --test twilio_api -- --ignored
//!    ```
//!
//! **WARNING**: The live tests are billed by Twilio!

use sms_otp::twilio::{TwilioClient, TwilioError, TwilioGateway, TwilioSettings};
use sms_otp::{
    Channel, CheckOutcome, Destination, OtpCode, OtpService, OtpServiceError, OtpServiceTrait,
    RetryConfig, RetryableError, RetryableGateway, SessionId, VerificationOutcome,
};
use std::env;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVICE: &str = "VA00000000000000000000000000000000";
const ACCOUNT: &str = "AC00000000000000000000000000000000";

fn mock_gateway(server: &MockServer) -> TwilioGateway {
    let settings = TwilioSettings::new(ACCOUNT, "token", "+15550000000", SERVICE);
    TwilioGateway::new(TwilioClient::with_base_url(settings, server.uri()).unwrap())
}

fn destination() -> Destination {
    Destination::new("+15551230000").unwrap()
}

fn verification_body(sid: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "sid": sid,
        "service_sid": SERVICE,
        "to": "+15551230000",
        "channel": "sms",
        "status": status,
        "valid": status == "approved"
    })
}

#[tokio::test]
async fn issue_and_verify_through_twilio() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/v2/Services/{SERVICE}/Verifications")))
        .respond_with(ResponseTemplate::new(201).set_body_json(verification_body("VE001", "pending")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/v2/Services/{SERVICE}/VerificationCheck")))
        .and(body_string_contains("Code=123456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(verification_body("VE001", "approved")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/v2/Services/{SERVICE}/VerificationCheck")))
        .and(body_string_contains("Code=000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(verification_body("VE001", "pending")))
        .mount(&server)
        .await;

    let service = OtpService::with_gateway(mock_gateway(&server));
    let d = destination();

    let session = service.issue_otp(&d, Channel::Sms).await.unwrap();
    assert_eq!(session.as_str(), "VE001");

    // Throttled before reaching the mock, which expects exactly one call.
    assert!(service.issue_otp(&d, Channel::Sms).await.unwrap_err().is_rate_limited());

    let wrong = service
        .verify_otp(&d, &OtpCode::new("000000").unwrap())
        .await
        .unwrap();
    assert!(matches!(wrong, CheckOutcome::Rejected { ref status } if status == "pending"));

    let right = service
        .verify_otp(&d, &OtpCode::new("123456").unwrap())
        .await
        .unwrap();
    assert_eq!(right, CheckOutcome::Approved);
}

#[tokio::test]
async fn invalid_number_is_permanent_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/v2/Services/{SERVICE}/Verifications")))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "code": 60200,
            "message": "Invalid parameter `To`: +15551230000",
            "more_info": "https://www.twilio.com/docs/errors/60200",
            "status": 400
        })))
        .mount(&server)
        .await;

    let service = OtpService::with_gateway(mock_gateway(&server));
    let d = destination();

    let error = service.issue_otp(&d, Channel::Sms).await.unwrap_err();
    assert!(matches!(
        error,
        OtpServiceError::Provider {
            is_retryable: false,
            ..
        }
    ));
    assert!(error.to_string().contains("60200"));

    // The failed attempt left no throttle behind.
    let again = service.issue_otp(&d, Channel::Sms).await.unwrap_err();
    assert!(!again.is_rate_limited());
}

#[tokio::test]
async fn status_lookup_maps_twilio_statuses() {
    let server = MockServer::start().await;

    for (sid, status) in [
        ("VE001", "approved"),
        ("VE002", "canceled"),
        ("VE003", "expired"),
        ("VE004", "pending"),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/v2/Services/{SERVICE}/Verifications/{sid}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(verification_body(sid, status)))
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path(format!("/v2/Services/{SERVICE}/Verifications/VE404")))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "code": 20404,
            "message": "The requested resource was not found",
            "status": 404
        })))
        .mount(&server)
        .await;

    let service = OtpService::with_gateway(mock_gateway(&server));

    let expected = [
        ("VE001", VerificationOutcome::Approved),
        ("VE002", VerificationOutcome::Rejected),
        ("VE003", VerificationOutcome::Expired),
        ("VE004", VerificationOutcome::Pending),
    ];
    for (sid, outcome) in expected {
        assert_eq!(
            service
                .get_verification_status(&SessionId::from(sid))
                .await
                .unwrap(),
            outcome
        );
    }

    let error = service
        .get_verification_status(&SessionId::from("VE404"))
        .await
        .unwrap_err();
    assert!(error.is_provider_error());
}

#[tokio::test]
async fn status_lookup_keeps_session_id_in_one_path_segment() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/2010-04-01/Accounts/{ACCOUNT}/Messages.json")))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "sid": "SM001" })))
        .expect(0)
        .mount(&server)
        .await;

    let service = OtpService::with_gateway(mock_gateway(&server));

    for id in [
        format!("../../../2010-04-01/Accounts/{ACCOUNT}/Messages.json"),
        format!("VE001/../../../../2010-04-01/Accounts/{ACCOUNT}/Messages.json"),
        "VE001/..".to_string(),
    ] {
        let error = service
            .get_verification_status(&SessionId::from(id))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            OtpServiceError::Provider {
                is_retryable: false,
                ..
            }
        ));
        assert!(error.to_string().contains("Invalid session id"));
    }

    let error = service
        .get_verification_status(&SessionId::from(" "))
        .await
        .unwrap_err();
    assert!(matches!(error, OtpServiceError::EmptySessionId));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn status_lookup_retries_server_errors_when_wrapped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/Services/{SERVICE}/Verifications/VE001")))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/Services/{SERVICE}/Verifications/VE001")))
        .respond_with(ResponseTemplate::new(200).set_body_json(verification_body("VE001", "approved")))
        .mount(&server)
        .await;

    let retry = RetryConfig::default()
        .with_min_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(20));
    let gateway = RetryableGateway::with_config(mock_gateway(&server), retry);
    let service = OtpService::with_gateway(gateway);

    let outcome = service
        .get_verification_status(&SessionId::from("VE001"))
        .await
        .unwrap();
    assert_eq!(outcome, VerificationOutcome::Approved);
}

#[tokio::test]
async fn message_delivery_error_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/2010-04-01/Accounts/{ACCOUNT}/Messages.json")))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "sid": "SM001",
            "status": "failed",
            "error_code": 21610,
            "error_message": "Attempt to send to unsubscribed recipient"
        })))
        .mount(&server)
        .await;

    let service = OtpService::with_gateway(mock_gateway(&server));

    let error = service
        .send_message(&destination(), "Your order has shipped")
        .await
        .unwrap_err();
    assert!(matches!(error, OtpServiceError::Delivery { code: 21610, .. }));
}

#[tokio::test]
async fn message_accepted_by_twilio() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/2010-04-01/Accounts/{ACCOUNT}/Messages.json")))
        .and(body_string_contains("To=%2B15551230000"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "sid": "SM002",
            "status": "queued",
            "error_code": null,
            "error_message": null
        })))
        .mount(&server)
        .await;

    let service = OtpService::with_gateway(mock_gateway(&server));

    let delivery = service
        .send_message(&destination(), "Your order has shipped")
        .await
        .unwrap();
    assert_eq!(delivery.message_id, "SM002");
    assert_eq!(delivery.status.as_deref(), Some("queued"));
}

#[tokio::test]
async fn auth_failure_is_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "code": 20003,
            "message": "Authenticate",
            "status": 401
        })))
        .mount(&server)
        .await;

    let gateway = mock_gateway(&server);
    let error = gateway
        .client()
        .create_verification(&destination(), Channel::Sms)
        .await
        .unwrap_err();
    assert!(matches!(error, TwilioError::Api(ref api) if api.status == 401));
    assert!(!error.is_retryable());
    assert!(!error.is_client_error());
}

// =============================================================================
// Live tests
// =============================================================================

/// Load settings from the environment or a `.env` file.
fn live_settings() -> TwilioSettings {
    dotenvy::dotenv().ok();

    TwilioSettings::from_env().expect(
        "Twilio settings must be set.\n\
         Either:\n\
         1. Copy tests/.env.example to .env and fill in your credentials\n\
         2. Export TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_FROM_NUMBER and TWILIO_VERIFY_SERVICE_SID",
    )
}

/// Destination used by the live tests.
fn live_destination() -> Destination {
    dotenvy::dotenv().ok();

    let raw = env::var("TWILIO_TEST_DESTINATION")
        .expect("TWILIO_TEST_DESTINATION must be set to a number you control");
    Destination::new(raw).expect("TWILIO_TEST_DESTINATION must be E.164")
}

#[tokio::test]
#[ignore = "requires Twilio credentials"]
async fn live_unknown_session_is_provider_error() {
    let service = OtpService::with_gateway(TwilioGateway::from_settings(live_settings()).unwrap());

    let error = service
        .get_verification_status(&SessionId::from("VE00000000000000000000000000000000"))
        .await
        .unwrap_err();
    println!("Unknown session: {error}");
    assert!(error.is_provider_error());
}

#[tokio::test]
#[ignore = "requires Twilio credentials and sends an SMS"]
async fn live_issue_then_status() {
    let service = OtpService::with_gateway(TwilioGateway::from_settings(live_settings()).unwrap());
    let d = live_destination();

    let session = service.issue_otp(&d, Channel::Sms).await.unwrap();
    println!("Started session: {session}");

    let status = service.get_verification_status(&session).await.unwrap();
    assert_eq!(status, VerificationOutcome::Pending);

    let wrong = service
        .verify_otp(&d, &OtpCode::new("000000").unwrap())
        .await
        .unwrap();
    assert!(!wrong.is_approved());

    assert!(service.issue_otp(&d, Channel::Sms).await.unwrap_err().is_rate_limited());
}

#[tokio::test]
#[ignore = "requires Twilio credentials and sends an SMS"]
async fn live_send_message() {
    let service = OtpService::with_gateway(TwilioGateway::from_settings(live_settings()).unwrap());

    let delivery = service
        .send_message(&live_destination(), "sms-otp integration test")
        .await
        .unwrap();
    println!("Message accepted: {} ({:?})", delivery.message_id, delivery.status);
}
