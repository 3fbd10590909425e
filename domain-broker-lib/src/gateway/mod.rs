//! Registrar gateway abstraction.
//!
//! A gateway checks availability for a batch of domains and submits single
//! registrations. Implementations are stateless translators over one
//! configured backend; which backend is used is decided by configuration
//! in [`build_gateway`], never by branching in business logic.

mod fake;
mod jsonrpc;

pub use fake::FakeRegistrar;
pub use jsonrpc::JsonRpcGateway;

use crate::config::{RegistrarConfig, RegistrarMode};
use crate::error::BrokerError;
use crate::types::{AuditPayload, Availability, OwnerMeta, RegistrationResult};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Availability of one domain as reported by the registrar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainCheck {
    pub availability: Availability,
    /// Registrar response fragment for this domain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<AuditPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether asking again may produce a definite answer
    #[serde(skip)]
    pub retryable: bool,
}

impl DomainCheck {
    pub fn available(raw_response: Option<AuditPayload>) -> Self {
        Self {
            availability: Availability::Available,
            raw_response,
            error: None,
            retryable: false,
        }
    }

    pub fn unavailable(raw_response: Option<AuditPayload>) -> Self {
        Self {
            availability: Availability::Unavailable,
            raw_response,
            error: None,
            retryable: false,
        }
    }

    /// No definite answer; `retryable` marks transient causes.
    pub fn unknown<E: Into<String>>(error: E, retryable: bool) -> Self {
        Self {
            availability: Availability::Unknown,
            raw_response: None,
            error: Some(error.into()),
            retryable,
        }
    }

    /// Unknown and worth asking again.
    pub fn needs_retry(&self) -> bool {
        self.availability == Availability::Unknown && self.retryable
    }
}

/// Per-domain results of one batch check.
pub type AvailabilityReport = BTreeMap<String, DomainCheck>;

/// Uniform interface over registrar backends.
#[async_trait]
pub trait RegistrarGateway: Send + Sync {
    /// Short backend name for logs and audit records.
    fn name(&self) -> &str;

    /// Check a deduplicated set of full domain names in one batch.
    ///
    /// An `Err` means the whole batch failed; the caller treats every member
    /// as unknown. Partial failures are reported per domain inside the map.
    async fn check_availability(
        &self,
        domains: &BTreeSet<String>,
    ) -> Result<AvailabilityReport, BrokerError>;

    /// Submit one registration. Never retried by the gateway.
    async fn register_domain(
        &self,
        domain: &str,
        period_years: u8,
        owner: &OwnerMeta,
    ) -> Result<RegistrationResult, BrokerError>;
}

/// Pick the backend named by the registrar mode.
pub fn build_gateway(config: &RegistrarConfig) -> Result<Arc<dyn RegistrarGateway>, BrokerError> {
    match config.mode {
        RegistrarMode::Fake => {
            let mut fake = FakeRegistrar::new().with_taken(config.taken.iter().cloned());
            if let Some(delay) = config.fake_delay {
                fake = fake.with_delay(delay);
            }
            Ok(Arc::new(fake))
        }
        RegistrarMode::Ote | RegistrarMode::Production => {
            Ok(Arc::new(JsonRpcGateway::from_config(config)?))
        }
    }
}

/// Replace credential values in a JSON payload before it is stored or logged.
pub(crate) fn redact_credentials(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                let key = key.to_ascii_lowercase();
                if matches!(key.as_str(), "pass" | "password" | "secret" | "token") {
                    *v = serde_json::Value::String("***".to_string());
                } else {
                    redact_credentials(v);
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(redact_credentials),
        _ => {}
    }
}
