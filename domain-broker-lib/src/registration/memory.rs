//! Process-local registration store.

use super::book::RecordBook;
use super::{RegistrationStore, Transition};
use crate::error::BrokerError;
use crate::types::{RegistrationRecord, RegistrationStatus};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Keeps records in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryRegistrationStore {
    book: RwLock<RecordBook>,
}

impl MemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationStore for MemoryRegistrationStore {
    async fn insert_pending(
        &self,
        record: RegistrationRecord,
    ) -> Result<RegistrationRecord, BrokerError> {
        self.book.write().await.insert_pending(record)
    }

    async fn transition(
        &self,
        id: Uuid,
        transition: Transition,
    ) -> Result<RegistrationRecord, BrokerError> {
        self.book.write().await.transition(id, transition)
    }

    async fn note_error(&self, id: Uuid, note: String) -> Result<RegistrationRecord, BrokerError> {
        self.book.write().await.note_error(id, note)
    }

    async fn get(&self, id: Uuid) -> Result<Option<RegistrationRecord>, BrokerError> {
        Ok(self.book.read().await.get(id))
    }

    async fn list_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<RegistrationRecord>, BrokerError> {
        Ok(self
            .book
            .read()
            .await
            .select(|r| r.customer_id == customer_id))
    }

    async fn list_pending(&self) -> Result<Vec<RegistrationRecord>, BrokerError> {
        Ok(self
            .book
            .read()
            .await
            .select(|r| r.status == RegistrationStatus::Pending))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
