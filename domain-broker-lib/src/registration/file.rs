//! JSON file registration store.
//!
//! The whole record set lives in one document that is rewritten on every
//! change: serialized to `<file>.tmp`, then renamed over the original.
//! A failed write leaves both the file and the in-memory state untouched.

use super::book::RecordBook;
use super::{RegistrationStore, Transition};
use crate::error::BrokerError;
use crate::types::{RegistrationRecord, RegistrationStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

const DOCUMENT_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct RecordsDocument {
    version: u16,
    records: Vec<RegistrationRecord>,
}

/// Registration records persisted to a JSON file.
#[derive(Debug)]
pub struct JsonFileRegistrationStore {
    path: PathBuf,
    book: Mutex<RecordBook>,
}

impl JsonFileRegistrationStore {
    /// Open a store, creating an empty one if the file does not exist yet.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, BrokerError> {
        let path = path.as_ref().to_path_buf();

        let book = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => RecordBook::default(),
            Ok(content) => {
                let document: RecordsDocument = serde_json::from_str(&content).map_err(|e| {
                    BrokerError::file_error(
                        path.to_string_lossy(),
                        format!("Invalid registration file: {}", e),
                    )
                })?;
                if document.version > DOCUMENT_VERSION {
                    return Err(BrokerError::file_error(
                        path.to_string_lossy(),
                        format!("Unsupported registration file version {}", document.version),
                    ));
                }
                RecordBook::from_records(document.records)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecordBook::default(),
            Err(e) => {
                return Err(BrokerError::file_error(
                    path.to_string_lossy(),
                    format!("Failed to read registration file: {}", e),
                ))
            }
        };

        Ok(Self {
            path,
            book: Mutex::new(book),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, book: &RecordBook) -> Result<(), BrokerError> {
        let document = RecordsDocument {
            version: DOCUMENT_VERSION,
            records: book.to_records(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.write_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.write_error(e))?;

        debug!(path = %self.path.display(), records = document.records.len(), "saved registrations");
        Ok(())
    }

    fn write_error(&self, e: std::io::Error) -> BrokerError {
        BrokerError::file_error(
            self.path.to_string_lossy(),
            format!("Failed to write registration file: {}", e),
        )
    }

    /// Apply a change to a copy of the book, persist it, then commit it.
    async fn mutate<F>(&self, change: F) -> Result<RegistrationRecord, BrokerError>
    where
        F: FnOnce(&mut RecordBook) -> Result<RegistrationRecord, BrokerError> + Send,
    {
        let mut book = self.book.lock().await;
        let mut next = book.clone();
        let record = change(&mut next)?;
        self.persist(&next).await?;
        *book = next;
        Ok(record)
    }
}

#[async_trait]
impl RegistrationStore for JsonFileRegistrationStore {
    async fn insert_pending(
        &self,
        record: RegistrationRecord,
    ) -> Result<RegistrationRecord, BrokerError> {
        self.mutate(|book| book.insert_pending(record)).await
    }

    async fn transition(
        &self,
        id: Uuid,
        transition: Transition,
    ) -> Result<RegistrationRecord, BrokerError> {
        self.mutate(|book| book.transition(id, transition)).await
    }

    async fn note_error(&self, id: Uuid, note: String) -> Result<RegistrationRecord, BrokerError> {
        self.mutate(|book| book.note_error(id, note)).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<RegistrationRecord>, BrokerError> {
        Ok(self.book.lock().await.get(id))
    }

    async fn list_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<RegistrationRecord>, BrokerError> {
        Ok(self
            .book
            .lock()
            .await
            .select(|r| r.customer_id == customer_id))
    }

    async fn list_pending(&self) -> Result<Vec<RegistrationRecord>, BrokerError> {
        Ok(self
            .book
            .lock()
            .await
            .select(|r| r.status == RegistrationStatus::Pending))
    }

    fn backend_name(&self) -> &'static str {
        "json-file"
    }
}
