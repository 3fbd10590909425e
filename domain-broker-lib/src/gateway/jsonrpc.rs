//! JSON-RPC registrar client (INWX domrobot convention).
//!
//! Every call is a POST of `{"jsonrpc", "method", "params", "id"}` to one
//! endpoint. The session is kept in a cookie after `account.login`.
//! Result codes: 1000/1001 success, 2xxx command rejected, anything else
//! an error.

use super::{redact_credentials, AvailabilityReport, DomainCheck, RegistrarGateway};
use crate::config::RegistrarConfig;
use crate::error::BrokerError;
use crate::types::{AuditPayload, OwnerMeta, RegistrationResult, SubmissionOutcome};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const CODE_OK: i64 = 1000;
const CODE_OK_PENDING: i64 = 1001;
const CODE_AUTH_ERROR: i64 = 2200;

pub struct JsonRpcGateway {
    client: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
    contact_handle: Option<String>,
    batch_size: usize,
    logged_in: Mutex<bool>,
    next_id: AtomicU64,
}

impl fmt::Debug for JsonRpcGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcGateway")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl JsonRpcGateway {
    /// Create a client for one endpoint.
    pub fn new<E, U, P>(
        endpoint: E,
        username: U,
        password: P,
        timeout: Duration,
    ) -> Result<Self, BrokerError>
    where
        E: Into<String>,
        U: Into<String>,
        P: Into<String>,
    {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .user_agent(concat!("domain-broker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BrokerError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            contact_handle: None,
            batch_size: 20,
            logged_in: Mutex::new(false),
            next_id: AtomicU64::new(1),
        })
    }

    /// Create a client from registrar settings (endpoint, credentials and contact handle required).
    pub fn from_config(config: &RegistrarConfig) -> Result<Self, BrokerError> {
        let endpoint = config.endpoint().ok_or_else(|| {
            BrokerError::config(format!("registrar mode '{}' has no endpoint", config.mode))
        })?;
        let (username, password) = match (&config.username, &config.password) {
            (Some(u), Some(p)) => (u.clone(), p.clone()),
            _ => {
                return Err(BrokerError::config(
                    "registrar username and password are required",
                ))
            }
        };

        let contact_handle = config.contact_handle.clone().ok_or_else(|| {
            BrokerError::config("a registrar contact handle is required to register")
        })?;

        Ok(Self::new(endpoint, username, password, config.timeout)?
            .with_batch_size(config.batch_size)
            .with_contact_handle(contact_handle))
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Contact handle used when the owner has none.
    pub fn with_contact_handle<H: Into<String>>(mut self, handle: H) -> Self {
        self.contact_handle = Some(handle.into());
        self
    }

    fn envelope(&self, method: &str, params: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// POST one envelope and return the decoded response body.
    async fn post(&self, envelope: &Value) -> Result<Value, BrokerError> {
        let response = self.client.post(&self.endpoint).json(envelope).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrokerError::registrar(format!(
                "{} answered HTTP {}",
                envelope["method"].as_str().unwrap_or("call"),
                status
            )));
        }

        Ok(response.json::<Value>().await?)
    }

    async fn ensure_login(&self) -> Result<(), BrokerError> {
        let mut logged_in = self.logged_in.lock().await;
        if *logged_in {
            return Ok(());
        }

        let envelope = self.envelope(
            "account.login",
            json!({ "user": self.username, "pass": self.password }),
        );
        let body = self.post(&envelope).await?;
        let result = result_of(&body)?;

        if result_code(result) != Some(CODE_OK) {
            return Err(BrokerError::Unauthorized {
                message: format!("registrar login failed: {}", result_message(result)),
            });
        }

        info!(endpoint = %self.endpoint, "logged in to registrar");
        *logged_in = true;
        Ok(())
    }

    async fn forget_session(&self) {
        *self.logged_in.lock().await = false;
    }

    async fn check_chunk(&self, chunk: &[&String]) -> Result<AvailabilityReport, BrokerError> {
        let envelope = self.envelope("domain.check", json!({ "domain": chunk }));
        let body = self.post(&envelope).await?;
        let result = result_of(&body)?;

        let code = result_code(result);
        if code != Some(CODE_OK) {
            if code == Some(CODE_AUTH_ERROR) {
                self.forget_session().await;
            }
            let message = format!("domain.check failed: {}", result_message(result));
            let retryable = !matches!(code, Some(c) if (2000..3000).contains(&c) && c != CODE_AUTH_ERROR);
            return Ok(chunk
                .iter()
                .map(|d| ((*d).clone(), DomainCheck::unknown(message.clone(), retryable)))
                .collect());
        }

        let entries: Vec<&Value> = match result.pointer("/resData/domain") {
            Some(Value::Array(items)) => items.iter().collect(),
            // Single-domain answers put the fields directly into resData.
            _ => result.get("resData").into_iter().collect(),
        };

        let mut report = AvailabilityReport::new();
        for entry in entries {
            let Some(domain) = entry.get("domain").and_then(Value::as_str) else {
                continue;
            };
            let domain = domain.to_ascii_lowercase();
            let raw = Some(AuditPayload::from_json(entry));
            let check = match entry.get("avail") {
                Some(Value::Bool(true)) => DomainCheck::available(raw),
                Some(Value::Bool(false)) => DomainCheck::unavailable(raw),
                Some(v) if v.as_i64() == Some(1) => DomainCheck::available(raw),
                Some(v) if v.as_i64() == Some(0) => DomainCheck::unavailable(raw),
                _ => DomainCheck {
                    raw_response: raw,
                    ..DomainCheck::unknown("registrar returned no availability", false)
                },
            };
            report.insert(domain, check);
        }

        for domain in chunk {
            if !report.contains_key(domain.as_str()) {
                report.insert(
                    (*domain).clone(),
                    DomainCheck::unknown("missing from registrar response", true),
                );
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl RegistrarGateway for JsonRpcGateway {
    fn name(&self) -> &str {
        "jsonrpc"
    }

    async fn check_availability(
        &self,
        domains: &BTreeSet<String>,
    ) -> Result<AvailabilityReport, BrokerError> {
        if domains.is_empty() {
            return Ok(AvailabilityReport::new());
        }

        self.ensure_login().await?;

        let all: Vec<&String> = domains.iter().collect();
        let chunks: Vec<&[&String]> = all.chunks(self.batch_size).collect();
        debug!(domains = all.len(), chunks = chunks.len(), "checking availability");

        let results = join_all(chunks.iter().map(|chunk| self.check_chunk(chunk))).await;

        let mut report = AvailabilityReport::new();
        let mut first_error = None;
        let mut failed_chunks = 0;

        for (chunk, result) in chunks.iter().zip(results) {
            match result {
                Ok(partial) => report.extend(partial),
                Err(e) => {
                    warn!(error = %e, size = chunk.len(), "availability chunk failed");
                    failed_chunks += 1;
                    for domain in chunk.iter() {
                        report.insert(
                            (*domain).clone(),
                            DomainCheck::unknown(e.to_string(), e.is_retryable()),
                        );
                    }
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) if failed_chunks == chunks.len() => Err(e),
            _ => Ok(report),
        }
    }

    async fn register_domain(
        &self,
        domain: &str,
        period_years: u8,
        owner: &OwnerMeta,
    ) -> Result<RegistrationResult, BrokerError> {
        let handle = owner
            .contact_handle
            .clone()
            .or_else(|| self.contact_handle.clone())
            .ok_or_else(|| {
                BrokerError::config("a registrar contact handle is required to register")
            })?;

        self.ensure_login().await?;

        let envelope = self.envelope(
            "domain.create",
            json!({
                "domain": domain,
                "period": format!("{}Y", period_years),
                "registrant": handle,
                "admin": handle,
                "tech": handle,
                "billing": handle,
            }),
        );

        info!(domain, period_years, "submitting registration");
        let body = self.post(&envelope).await?;

        let mut recorded_request = envelope;
        redact_credentials(&mut recorded_request);

        let (outcome, message) = match result_of(&body) {
            Ok(result) => {
                let outcome = match result_code(result) {
                    Some(CODE_OK) | Some(CODE_OK_PENDING) => SubmissionOutcome::Accepted,
                    Some(c) if (2000..3000).contains(&c) => SubmissionOutcome::Rejected,
                    _ => SubmissionOutcome::Error,
                };
                (outcome, Some(result_message(result)))
            }
            Err(e) => (SubmissionOutcome::Error, Some(e.to_string())),
        };

        Ok(RegistrationResult {
            outcome,
            raw_request: AuditPayload::from_json(&recorded_request),
            raw_response: AuditPayload::from_json(&body),
            message,
        })
    }
}

/// The result object: JSON-RPC `result` member, or the body itself.
fn result_of(body: &Value) -> Result<&Value, BrokerError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        return Err(BrokerError::registrar(format!("registrar error: {}", error)));
    }
    Ok(match body.get("result") {
        Some(result) if result.is_object() => result,
        _ => body,
    })
}

fn result_code(result: &Value) -> Option<i64> {
    result.get("code").and_then(Value::as_i64)
}

fn result_message(result: &Value) -> String {
    result
        .get("msg")
        .and_then(Value::as_str)
        .unwrap_or("no message")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_of_unwraps_jsonrpc_envelope() {
        let wrapped = json!({ "jsonrpc": "2.0", "id": 1, "result": { "code": 1000 } });
        assert_eq!(result_code(result_of(&wrapped).unwrap()), Some(1000));

        let bare = json!({ "code": 2302, "msg": "Object exists" });
        assert_eq!(result_code(result_of(&bare).unwrap()), Some(2302));
        assert_eq!(result_message(&bare), "Object exists");

        let failed = json!({ "error": { "code": -32601, "message": "Method not found" } });
        assert!(result_of(&failed).is_err());
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = RegistrarConfig {
            mode: crate::config::RegistrarMode::Ote,
            ..Default::default()
        };
        assert!(JsonRpcGateway::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config_requires_contact_handle() {
        let mut config = RegistrarConfig {
            mode: crate::config::RegistrarMode::Ote,
            username: Some("u".into()),
            password: Some("p".into()),
            ..Default::default()
        };
        let err = JsonRpcGateway::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("contact handle"));

        config.contact_handle = Some("HANDLE-42".into());
        assert!(JsonRpcGateway::from_config(&config).is_ok());
    }
}
