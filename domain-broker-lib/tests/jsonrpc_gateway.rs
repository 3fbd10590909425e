//! Wire-level tests of the JSON-RPC registrar gateway against a mock server.

mod common;

use common::*;
use domain_broker_lib::{
    Availability, BrokerError, OwnerMeta, RegistrarGateway, SubmissionOutcome,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn domains(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn owner() -> OwnerMeta {
    OwnerMeta {
        customer_id: Uuid::nil(),
        name: "Schmidt Bau GmbH".into(),
        email: "info@schmidt-bau.de".into(),
        country: "DE".into(),
        contact_handle: None,
    }
}

#[tokio::test]
async fn test_login_happens_once_per_session() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_check(
        &server,
        &["schmidt-bau.com", "schmidt-bau.de"],
        ResponseTemplate::new(200).set_body_json(check_body(&[
            ("schmidt-bau.com", false),
            ("schmidt-bau.de", true),
        ])),
    )
    .await;

    let gateway = gateway_for(&server, Duration::from_secs(2));
    let batch = domains(&["schmidt-bau.de", "schmidt-bau.com"]);

    for _ in 0..2 {
        let report = gateway.check_availability(&batch).await.unwrap();
        assert_eq!(report["schmidt-bau.de"].availability, Availability::Available);
        assert_eq!(report["schmidt-bau.com"].availability, Availability::Unavailable);
        assert!(report["schmidt-bau.de"]
            .raw_response
            .as_ref()
            .unwrap()
            .body
            .contains("\"free\""));
    }
}

#[tokio::test]
async fn test_failed_chunk_degrades_only_its_domains() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_check(
        &server,
        &["a-bau.de", "b-bau.de"],
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": check_body(&[("a-bau.de", true), ("b-bau.de", false)])
        })),
    )
    .await;
    mount_check(&server, &["c-bau.de"], ResponseTemplate::new(500)).await;

    let gateway = gateway_for(&server, Duration::from_secs(2)).with_batch_size(2);
    let report = gateway
        .check_availability(&domains(&["a-bau.de", "b-bau.de", "c-bau.de"]))
        .await
        .unwrap();

    assert_eq!(report["a-bau.de"].availability, Availability::Available);
    assert_eq!(report["b-bau.de"].availability, Availability::Unavailable);
    assert_eq!(report["c-bau.de"].availability, Availability::Unknown);
    assert!(report["c-bau.de"].needs_retry());
}

#[tokio::test]
async fn test_all_chunks_failing_is_an_error() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_check(&server, &["a-bau.de"], ResponseTemplate::new(503)).await;

    let gateway = gateway_for(&server, Duration::from_secs(2));
    let err = gateway
        .check_availability(&domains(&["a-bau.de"]))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::RegistrarUnavailable { .. }));
}

#[tokio::test]
async fn test_slow_registrar_times_out() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_check(
        &server,
        &["a-bau.de"],
        ResponseTemplate::new(200)
            .set_body_json(check_body(&[("a-bau.de", true)]))
            .set_delay(Duration::from_millis(800)),
    )
    .await;

    let gateway = gateway_for(&server, Duration::from_millis(150));
    let err = gateway
        .check_availability(&domains(&["a-bau.de"]))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::RegistrarTimeout { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_rejected_login_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_partial_json(json!({ "method": "account.login" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 2200,
            "msg": "Authentication error"
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Duration::from_secs(2));
    let err = gateway
        .check_availability(&domains(&["a-bau.de"]))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_register_accepted_with_audit_payloads() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_partial_json(json!({
            "method": "domain.create",
            "params": { "domain": "schmidt-bau.de", "period": "2Y", "registrant": "HANDLE-42" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1000,
            "msg": "Command completed successfully",
            "resData": { "roId": "12345" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Duration::from_secs(2)).with_contact_handle("HANDLE-42");
    let result = gateway
        .register_domain("schmidt-bau.de", 2, &owner())
        .await
        .unwrap();

    assert_eq!(result.outcome, SubmissionOutcome::Accepted);
    assert!(result.raw_request.body.contains("domain.create"));
    assert!(!result.raw_request.body.contains("s3cret"));
    assert!(result.raw_response.body.contains("12345"));
}

#[tokio::test]
async fn test_register_rejected_by_registry() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_partial_json(json!({ "method": "domain.create" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 2302,
            "msg": "Object exists"
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, Duration::from_secs(2)).with_contact_handle("HANDLE-42");
    let result = gateway
        .register_domain("schmidt-bau.de", 1, &owner())
        .await
        .unwrap();

    assert_eq!(result.outcome, SubmissionOutcome::Rejected);
    assert_eq!(result.message.as_deref(), Some("Object exists"));
}

#[tokio::test]
async fn test_register_without_contact_handle_is_refused_locally() {
    let server = MockServer::start().await;
    let gateway = gateway_for(&server, Duration::from_secs(2));

    let err = gateway
        .register_domain("schmidt-bau.de", 1, &owner())
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::Config { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}
