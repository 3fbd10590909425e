//! Record bookkeeping rules shared by every store backend.

use super::Transition;
use crate::error::BrokerError;
use crate::types::{RegistrationRecord, RegistrationStatus};
use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

/// All records of one store, keyed by id.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordBook {
    records: HashMap<Uuid, RegistrationRecord>,
}

impl RecordBook {
    pub(crate) fn from_records(records: Vec<RegistrationRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    pub(crate) fn to_records(&self) -> Vec<RegistrationRecord> {
        let mut records: Vec<RegistrationRecord> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        records
    }

    /// Insert a pending record.
    ///
    /// At most one record per (customer, domain) may be pending, and a domain
    /// already registered for the customer cannot be submitted again. The
    /// newest failed or cancelled predecessor is linked via `supersedes`.
    pub(crate) fn insert_pending(
        &mut self,
        mut record: RegistrationRecord,
    ) -> Result<RegistrationRecord, BrokerError> {
        if self.records.contains_key(&record.id) {
            return Err(BrokerError::internal(format!(
                "registration record {} already exists",
                record.id
            )));
        }

        let same_pair: Vec<&RegistrationRecord> = self
            .records
            .values()
            .filter(|r| r.customer_id == record.customer_id && r.domain == record.domain)
            .collect();

        let mut predecessor: Option<&RegistrationRecord> = None;
        for existing in same_pair.iter().copied() {
            match existing.status {
                RegistrationStatus::Pending => {
                    return Err(BrokerError::duplicate(
                        &record.domain,
                        Some(existing.id),
                        "a registration for this domain is already pending",
                    ))
                }
                RegistrationStatus::Registered => {
                    return Err(BrokerError::duplicate(
                        &record.domain,
                        Some(existing.id),
                        "the domain is already registered for this customer",
                    ))
                }
                RegistrationStatus::Failed | RegistrationStatus::Cancelled => {
                    // Only the head of the retry chain can be superseded again.
                    if same_pair.iter().any(|r| r.supersedes == Some(existing.id)) {
                        continue;
                    }
                    let newer = predecessor
                        .map(|p| (existing.created_at, existing.id) > (p.created_at, p.id))
                        .unwrap_or(true);
                    if newer {
                        predecessor = Some(existing);
                    }
                }
            }
        }

        record.status = RegistrationStatus::Pending;
        record.supersedes = predecessor.map(|p| p.id);
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    /// Apply the single allowed transition out of `pending`.
    pub(crate) fn transition(
        &mut self,
        id: Uuid,
        transition: Transition,
    ) -> Result<RegistrationRecord, BrokerError> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or(BrokerError::RecordNotFound { id })?;

        if record.status.is_final() {
            return Err(BrokerError::duplicate(
                &record.domain,
                Some(id),
                format!("record is already {}", record.status),
            ));
        }

        match transition {
            Transition::Finalize(result) => {
                record.status = result.outcome.final_status();
                record.request_payload = Some(result.raw_request);
                record.response_payload = Some(result.raw_response);
                if record.status == RegistrationStatus::Failed {
                    record.last_error = result.message.or(record.last_error.take());
                }
            }
            Transition::Cancel { reason } => {
                record.status = RegistrationStatus::Cancelled;
                if reason.is_some() {
                    record.last_error = reason;
                }
            }
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    /// Attach an infrastructure note to a pending record without changing its status.
    pub(crate) fn note_error(
        &mut self,
        id: Uuid,
        note: String,
    ) -> Result<RegistrationRecord, BrokerError> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or(BrokerError::RecordNotFound { id })?;

        if record.status.is_final() {
            return Err(BrokerError::duplicate(
                &record.domain,
                Some(id),
                format!("record is already {}", record.status),
            ));
        }

        record.last_error = Some(note);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    pub(crate) fn get(&self, id: Uuid) -> Option<RegistrationRecord> {
        self.records.get(&id).cloned()
    }

    /// Records matching a filter, newest first.
    pub(crate) fn select<F>(&self, filter: F) -> Vec<RegistrationRecord>
    where
        F: Fn(&RegistrationRecord) -> bool,
    {
        let mut records: Vec<RegistrationRecord> =
            self.records.values().filter(|r| filter(r)).cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records
    }
}
