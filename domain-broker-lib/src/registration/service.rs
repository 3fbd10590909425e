use super::RegistrationRecorder;
use crate::catalog::TldCatalog;
use crate::error::BrokerError;
use crate::gateway::RegistrarGateway;
use crate::normalize::split_domain;
use crate::types::{Customer, DomainCandidate, OwnerMeta, RegistrationRecord};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Longest contract period a registrar accepts.
pub const MAX_PERIOD_YEARS: u8 = 10;

/// Drives one registration from catalog lookup to a finalized record.
///
/// The registrar call is never repeated here. When its outcome is not
/// observed (timeout, transport failure) the record stays `pending` with a
/// note, and reconciliation is left to whoever lists pending records. A
/// gateway that refuses to send the request at all cancels the record.
#[derive(Clone)]
pub struct RegistrationService {
    catalog: Arc<dyn TldCatalog>,
    gateway: Arc<dyn RegistrarGateway>,
    recorder: RegistrationRecorder,
    timeout: Duration,
    registrar_id: String,
}

impl RegistrationService {
    pub fn new(
        catalog: Arc<dyn TldCatalog>,
        gateway: Arc<dyn RegistrarGateway>,
        recorder: RegistrationRecorder,
    ) -> Self {
        Self {
            catalog,
            gateway,
            recorder,
            timeout: Duration::from_secs(5),
            registrar_id: "inwx".to_string(),
        }
    }

    /// Time allowed for the registrar round-trip.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Registrar whose price table supplies the purchase cost.
    pub fn with_registrar_id<R: Into<String>>(mut self, registrar_id: R) -> Self {
        self.registrar_id = registrar_id.into();
        self
    }

    pub fn recorder(&self) -> &RegistrationRecorder {
        &self.recorder
    }

    /// Register a domain for a customer.
    ///
    /// # Errors
    ///
    /// * `InvalidDomain` / `UnsupportedTld` / `UnresolvablePrice` before any record is written
    /// * `DuplicateSubmission` if the customer already has this domain pending or registered
    /// * `RegistrarTimeout` / `RegistrarUnavailable` when the outcome is unknown; the record stays pending
    /// * `Config` when the gateway could not send the request; the record is cancelled
    pub async fn submit(
        &self,
        customer: &Customer,
        domain: &str,
        period_years: u8,
    ) -> Result<RegistrationRecord, BrokerError> {
        let (label, tld) = split_domain(domain)?;
        if !(1..=MAX_PERIOD_YEARS).contains(&period_years) {
            return Err(BrokerError::invalid_domain(
                format!("{}.{}", label, tld),
                format!("period must be 1 to {} years", MAX_PERIOD_YEARS),
            ));
        }

        let snapshot = self.catalog.snapshot().await?;
        let sell_price = snapshot.sell_price(&tld)?.times(period_years);
        let purchase_cost = snapshot
            .registrar_pricing(&tld, &self.registrar_id)
            .map(|p| p.registration.cost.times(period_years));

        let record = self
            .recorder
            .create(
                customer,
                DomainCandidate {
                    label,
                    tld,
                    sell_price,
                    purchase_cost,
                    period_years,
                },
            )
            .await?;

        let owner = OwnerMeta::from(customer);
        let call = self
            .gateway
            .register_domain(&record.domain, period_years, &owner);

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(result)) => self.recorder.finalize(record.id, result).await,
            Ok(Err(e @ BrokerError::Config { .. })) => {
                // Nothing reached the registrar.
                warn!(record_id = %record.id, domain = %record.domain, error = %e, "registration not attempted");
                if let Err(store_err) = self.recorder.cancel(record.id, Some(e.to_string())).await {
                    warn!(record_id = %record.id, error = %store_err, "could not cancel unsent registration");
                }
                Err(e)
            }
            Ok(Err(e)) => {
                warn!(record_id = %record.id, domain = %record.domain, error = %e, "registration outcome unknown");
                self.leave_pending(&record, &e).await;
                Err(e)
            }
            Err(_) => {
                let e = BrokerError::timeout("domain.create", self.timeout);
                warn!(record_id = %record.id, domain = %record.domain, timeout = ?self.timeout, "registration timed out");
                self.leave_pending(&record, &e).await;
                Err(e)
            }
        }
    }

    /// Note the failure on a pending record. The caller still gets the
    /// registrar error if the note cannot be stored.
    async fn leave_pending(&self, record: &RegistrationRecord, error: &BrokerError) {
        if let Err(store_err) = self
            .recorder
            .mark_pending_error(record.id, error.to_string())
            .await
        {
            warn!(record_id = %record.id, error = %store_err, "could not note registrar failure on record");
        }
    }

    /// Withdraw a pending record.
    pub async fn cancel(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<RegistrationRecord, BrokerError> {
        let record = self.recorder.cancel(id, reason).await?;
        info!(record_id = %id, domain = %record.domain, "registration withdrawn");
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<RegistrationRecord, BrokerError> {
        self.recorder.get(id).await
    }

    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<RegistrationRecord>, BrokerError> {
        self.recorder.list_for_customer(customer_id).await
    }

    pub async fn list_pending(&self) -> Result<Vec<RegistrationRecord>, BrokerError> {
        self.recorder.list_pending().await
    }
}
