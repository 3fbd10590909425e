//! Shared helpers for integration tests.
#![allow(dead_code)]

use domain_broker_lib::{Customer, JsonRpcGateway};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const RPC_PATH: &str = "/jsonrpc/";

/// Gateway pointed at a mock server.
pub fn gateway_for(server: &MockServer, timeout: Duration) -> JsonRpcGateway {
    JsonRpcGateway::new(
        format!("{}{}", server.uri(), RPC_PATH),
        "broker-test",
        "s3cret",
        timeout,
    )
    .unwrap()
}

/// Mounts a successful `account.login`, expected exactly `times` times.
pub async fn mount_login(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_partial_json(json!({ "method": "account.login" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "code": 1000, "msg": "Command completed successfully" }
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// `domain.check` answer body for (domain, available) pairs.
pub fn check_body(entries: &[(&str, bool)]) -> Value {
    let domains: Vec<Value> = entries
        .iter()
        .map(|(domain, avail)| {
            json!({
                "domain": domain,
                "avail": u8::from(*avail),
                "status": if *avail { "free" } else { "registered" },
                "checktime": 0.02
            })
        })
        .collect();
    json!({
        "code": 1000,
        "msg": "Command completed successfully",
        "resData": { "domain": domains }
    })
}

/// Mounts a `domain.check` answer for one exact chunk of domains.
pub async fn mount_check(server: &MockServer, chunk: &[&str], response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_partial_json(json!({
            "method": "domain.check",
            "params": { "domain": chunk }
        })))
        .respond_with(response)
        .mount(server)
        .await;
}

pub fn customer(name: &str, country: &str, industry: Option<&str>) -> Customer {
    Customer {
        id: Uuid::new_v4(),
        partner_id: Uuid::new_v4(),
        name: name.to_string(),
        email: "kontakt@example.de".to_string(),
        country: country.to_string(),
        industry: industry.map(str::to_string),
        synced_at: None,
    }
}
