//! Registration bookkeeping and submission.
//!
//! The [`RegistrationRecorder`] writes a `pending` record before any
//! registrar call is made and allows exactly one transition out of
//! `pending` afterwards. The [`RegistrationService`] drives one submission
//! through catalog lookup, record creation and the gateway call.

mod book;
mod file;
mod memory;
mod service;

pub use file::JsonFileRegistrationStore;
pub use memory::MemoryRegistrationStore;
pub use service::RegistrationService;

use crate::error::BrokerError;
use crate::types::{
    Customer, DomainCandidate, RegistrationRecord, RegistrationResult, RegistrationStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Status change applied to a pending record.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Registrar round-trip completed with an observed outcome
    Finalize(RegistrationResult),
    /// Withdrawn before an outcome was observed
    Cancel { reason: Option<String> },
}

/// Durable storage of registration records.
///
/// Implementations apply the pending/finalize rules atomically, so two
/// concurrent callers can never both succeed for the same record or the
/// same (customer, domain) pair.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Insert a new pending record, rejecting a second pending one for the
    /// same customer and domain.
    async fn insert_pending(
        &self,
        record: RegistrationRecord,
    ) -> Result<RegistrationRecord, BrokerError>;

    async fn transition(
        &self,
        id: Uuid,
        transition: Transition,
    ) -> Result<RegistrationRecord, BrokerError>;

    /// Store a note on a pending record (timeouts, transport failures).
    async fn note_error(&self, id: Uuid, note: String) -> Result<RegistrationRecord, BrokerError>;

    async fn get(&self, id: Uuid) -> Result<Option<RegistrationRecord>, BrokerError>;

    /// Records of one customer, newest first.
    async fn list_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<RegistrationRecord>, BrokerError>;

    /// All pending records, newest first.
    async fn list_pending(&self) -> Result<Vec<RegistrationRecord>, BrokerError>;

    fn backend_name(&self) -> &'static str;
}

/// Create/finalize API over a store.
#[derive(Clone)]
pub struct RegistrationRecorder {
    store: Arc<dyn RegistrationStore>,
}

impl RegistrationRecorder {
    pub fn new(store: Arc<dyn RegistrationStore>) -> Self {
        Self { store }
    }

    /// Write a pending record for a chosen candidate and return it.
    ///
    /// This is the serialization point per (customer, domain): a second
    /// call while the first record is pending fails with
    /// `DuplicateSubmission`.
    pub async fn create(
        &self,
        customer: &Customer,
        candidate: DomainCandidate,
    ) -> Result<RegistrationRecord, BrokerError> {
        let now = Utc::now();
        let domain = candidate.domain();
        let record = RegistrationRecord {
            id: Uuid::new_v4(),
            customer_id: customer.id,
            partner_id: Some(customer.partner_id),
            label: candidate.label,
            tld: candidate.tld,
            domain,
            sell_price: candidate.sell_price,
            purchase_cost: candidate.purchase_cost,
            period_years: candidate.period_years,
            status: RegistrationStatus::Pending,
            request_payload: None,
            response_payload: None,
            last_error: None,
            supersedes: None,
            created_at: now,
            updated_at: now,
        };

        let record = self.store.insert_pending(record).await?;
        info!(
            record_id = %record.id,
            customer_id = %record.customer_id,
            domain = %record.domain,
            supersedes = ?record.supersedes,
            "created pending registration"
        );
        Ok(record)
    }

    /// Record the registrar outcome. Allowed once per record.
    pub async fn finalize(
        &self,
        id: Uuid,
        result: RegistrationResult,
    ) -> Result<RegistrationRecord, BrokerError> {
        let record = self.store.transition(id, Transition::Finalize(result)).await?;
        info!(record_id = %id, status = %record.status, "finalized registration");
        Ok(record)
    }

    /// Withdraw a pending record.
    pub async fn cancel(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<RegistrationRecord, BrokerError> {
        let record = self.store.transition(id, Transition::Cancel { reason }).await?;
        info!(record_id = %id, "cancelled registration");
        Ok(record)
    }

    /// Keep the record pending but remember what went wrong.
    pub async fn mark_pending_error(
        &self,
        id: Uuid,
        note: String,
    ) -> Result<RegistrationRecord, BrokerError> {
        self.store.note_error(id, note).await
    }

    pub async fn get(&self, id: Uuid) -> Result<RegistrationRecord, BrokerError> {
        self.store
            .get(id)
            .await?
            .ok_or(BrokerError::RecordNotFound { id })
    }

    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<RegistrationRecord>, BrokerError> {
        self.store.list_for_customer(customer_id).await
    }

    pub async fn list_pending(&self) -> Result<Vec<RegistrationRecord>, BrokerError> {
        self.store.list_pending().await
    }

    /// The pending record of a customer for a domain, if any.
    pub async fn pending_for(
        &self,
        customer_id: Uuid,
        domain: &str,
    ) -> Result<Option<RegistrationRecord>, BrokerError> {
        let domain = domain.trim().to_ascii_lowercase();
        Ok(self
            .store
            .list_for_customer(customer_id)
            .await?
            .into_iter()
            .find(|r| r.domain == domain && r.status == RegistrationStatus::Pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuditPayload, Money, SubmissionOutcome};

    fn customer() -> Customer {
        Customer {
            id: Uuid::new_v4(),
            partner_id: Uuid::new_v4(),
            name: "Schmidt Bau".into(),
            email: "info@schmidt-bau.de".into(),
            country: "DE".into(),
            industry: Some("handwerker".into()),
            synced_at: None,
        }
    }

    fn candidate() -> DomainCandidate {
        DomainCandidate {
            label: "schmidt-bau".into(),
            tld: "de".into(),
            sell_price: Money::from_cents(899),
            purchase_cost: Some(Money::from_cents(350)),
            period_years: 1,
        }
    }

    fn result(outcome: SubmissionOutcome) -> RegistrationResult {
        RegistrationResult {
            outcome,
            raw_request: AuditPayload::from_text("req"),
            raw_response: AuditPayload::from_text(format!("{:?}", outcome)),
            message: None,
        }
    }

    #[tokio::test]
    async fn test_second_finalize_is_rejected() {
        let recorder = RegistrationRecorder::new(Arc::new(MemoryRegistrationStore::new()));
        let record = recorder.create(&customer(), candidate()).await.unwrap();
        assert_eq!(record.status, RegistrationStatus::Pending);
        assert_eq!(record.domain, "schmidt-bau.de");

        let first = recorder
            .finalize(record.id, result(SubmissionOutcome::Accepted))
            .await
            .unwrap();
        assert_eq!(first.status, RegistrationStatus::Registered);

        let second = recorder
            .finalize(record.id, result(SubmissionOutcome::Rejected))
            .await;
        assert!(matches!(
            second,
            Err(BrokerError::DuplicateSubmission { .. })
        ));

        let stored = recorder.get(record.id).await.unwrap();
        assert_eq!(stored.status, RegistrationStatus::Registered);
        assert_eq!(stored.response_payload.unwrap().body, "Accepted");
    }

    #[tokio::test]
    async fn test_pending_record_blocks_second_create() {
        let recorder = RegistrationRecorder::new(Arc::new(MemoryRegistrationStore::new()));
        let customer = customer();
        let first = recorder.create(&customer, candidate()).await.unwrap();

        let err = recorder.create(&customer, candidate()).await.unwrap_err();
        match err {
            BrokerError::DuplicateSubmission { record_id, .. } => {
                assert_eq!(record_id, Some(first.id))
            }
            other => panic!("unexpected error: {other}"),
        }

        // Another customer may still try the same domain.
        assert!(recorder.create(&self::customer(), candidate()).await.is_ok());
    }

    #[tokio::test]
    async fn test_retry_after_failure_supersedes() {
        let recorder = RegistrationRecorder::new(Arc::new(MemoryRegistrationStore::new()));
        let customer = customer();
        let first = recorder.create(&customer, candidate()).await.unwrap();
        recorder
            .finalize(first.id, result(SubmissionOutcome::Error))
            .await
            .unwrap();

        let second = recorder.create(&customer, candidate()).await.unwrap();
        assert_eq!(second.supersedes, Some(first.id));

        recorder.cancel(second.id, None).await.unwrap();
        let third = recorder.create(&customer, candidate()).await.unwrap();
        assert_eq!(third.supersedes, Some(second.id));

        let history = recorder.list_for_customer(customer.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].id, third.id);
    }

    #[tokio::test]
    async fn test_note_error_keeps_pending() {
        let recorder = RegistrationRecorder::new(Arc::new(MemoryRegistrationStore::new()));
        let customer = customer();
        let record = recorder.create(&customer, candidate()).await.unwrap();

        let noted = recorder
            .mark_pending_error(record.id, "timed out".into())
            .await
            .unwrap();
        assert_eq!(noted.status, RegistrationStatus::Pending);
        assert_eq!(noted.last_error.as_deref(), Some("timed out"));

        let pending = recorder.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(recorder
            .pending_for(customer.id, "Schmidt-Bau.de")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_unknown_record() {
        let recorder = RegistrationRecorder::new(Arc::new(MemoryRegistrationStore::new()));
        let id = Uuid::new_v4();
        assert!(matches!(
            recorder.get(id).await,
            Err(BrokerError::RecordNotFound { .. })
        ));
        assert!(matches!(
            recorder.cancel(id, None).await,
            Err(BrokerError::RecordNotFound { .. })
        ));
    }
}
