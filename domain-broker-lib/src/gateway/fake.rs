//! In-process registrar stand-in.
//!
//! Answers deterministically from a set of taken domains. Domains it
//! accepts a registration for become taken, like at a real registry.

use super::{AvailabilityReport, DomainCheck, RegistrarGateway};
use crate::error::BrokerError;
use crate::types::{AuditPayload, OwnerMeta, RegistrationResult, SubmissionOutcome};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
pub struct FakeRegistrar {
    taken: RwLock<HashSet<String>>,
    delay: Option<Duration>,
}

impl FakeRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark domains as already registered.
    pub fn with_taken<I, S>(self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let taken = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_ascii_lowercase())
            .collect();
        Self {
            taken: RwLock::new(taken),
            ..self
        }
    }

    /// Delay every answer, to exercise caller timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RegistrarGateway for FakeRegistrar {
    fn name(&self) -> &str {
        "fake"
    }

    async fn check_availability(
        &self,
        domains: &BTreeSet<String>,
    ) -> Result<AvailabilityReport, BrokerError> {
        self.pause().await;
        let taken = self.taken.read().await;

        let report = domains
            .iter()
            .map(|domain| {
                let avail = !taken.contains(&domain.to_ascii_lowercase());
                let raw = AuditPayload::from_json(&json!({
                    "domain": domain,
                    "avail": u8::from(avail),
                    "status": if avail { "free" } else { "registered" },
                }));
                let check = if avail {
                    DomainCheck::available(Some(raw))
                } else {
                    DomainCheck::unavailable(Some(raw))
                };
                (domain.clone(), check)
            })
            .collect();

        debug!(count = domains.len(), "fake registrar answered check");
        Ok(report)
    }

    async fn register_domain(
        &self,
        domain: &str,
        period_years: u8,
        owner: &OwnerMeta,
    ) -> Result<RegistrationResult, BrokerError> {
        self.pause().await;
        let domain = domain.to_ascii_lowercase();

        let request = json!({
            "method": "domain.create",
            "params": {
                "domain": domain,
                "period": format!("{}Y", period_years),
                "registrant": owner.contact_handle,
                "owner": { "name": owner.name, "email": owner.email, "country": owner.country },
            }
        });

        let mut taken = self.taken.write().await;
        let (outcome, response) = if taken.insert(domain.clone()) {
            (
                SubmissionOutcome::Accepted,
                json!({ "code": 1000, "msg": "Command completed successfully",
                        "resData": { "roId": format!("fake-reg-{}", domain), "status": "OK" } }),
            )
        } else {
            (
                SubmissionOutcome::Rejected,
                json!({ "code": 2302, "msg": "Object exists" }),
            )
        };

        Ok(RegistrationResult {
            outcome,
            raw_request: AuditPayload::from_json(&request),
            message: response["msg"].as_str().map(str::to_string),
            raw_response: AuditPayload::from_json(&response),
        })
    }
}
