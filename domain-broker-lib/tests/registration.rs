//! Registration submission and bookkeeping over the public API.

mod common;

use common::customer;
use domain_broker_lib::{
    default_catalog, BrokerError, FakeRegistrar, JsonFileRegistrationStore,
    MemoryRegistrationStore, RegistrationRecorder, RegistrationService, RegistrationStatus,
    RegistrationStore,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn service(registrar: FakeRegistrar, store: Arc<dyn RegistrationStore>) -> RegistrationService {
    RegistrationService::new(
        Arc::new(default_catalog()),
        Arc::new(registrar),
        RegistrationRecorder::new(store),
    )
    .with_timeout(Duration::from_millis(500))
}

#[tokio::test]
async fn test_concurrent_submissions_only_one_wins() {
    let service = service(
        FakeRegistrar::new().with_delay(Duration::from_millis(100)),
        Arc::new(MemoryRegistrationStore::new()),
    );
    let customer = customer("Schmidt Bau GmbH", "DE", Some("handwerker"));

    let (a, b) = tokio::join!(
        service.submit(&customer, "schmidt-bau.de", 1),
        service.submit(&customer, "schmidt-bau.de", 1),
    );

    let outcomes = [a, b];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    let duplicates = outcomes
        .iter()
        .filter(|r| matches!(r, Err(BrokerError::DuplicateSubmission { .. })))
        .count();
    assert_eq!((wins, duplicates), (1, 1));

    let records = service.list_for_customer(customer.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RegistrationStatus::Registered);
}

#[tokio::test]
async fn test_registered_domain_cannot_be_submitted_again() {
    let service = service(FakeRegistrar::new(), Arc::new(MemoryRegistrationStore::new()));
    let customer = customer("Café Müller", "DE", None);

    service.submit(&customer, "cafe-mueller.de", 1).await.unwrap();
    let again = service.submit(&customer, "cafe-mueller.de", 1).await;
    assert!(matches!(again, Err(BrokerError::DuplicateSubmission { .. })));
}

#[tokio::test]
async fn test_cancelled_timeout_can_be_resubmitted() {
    let store: Arc<dyn RegistrationStore> = Arc::new(MemoryRegistrationStore::new());
    let slow = service(
        FakeRegistrar::new().with_delay(Duration::from_secs(2)),
        store.clone(),
    );
    let customer = customer("Café Müller", "DE", None);

    let err = slow.submit(&customer, "cafe-mueller.de", 1).await.unwrap_err();
    assert!(matches!(err, BrokerError::RegistrarTimeout { .. }));

    let pending = slow.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    let stuck = pending[0].id;

    // Reconciliation decided the first attempt never reached the registry.
    let cancelled = slow
        .cancel(stuck, Some("no registry record found".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, RegistrationStatus::Cancelled);
    assert!(matches!(
        slow.cancel(stuck, None).await,
        Err(BrokerError::DuplicateSubmission { .. })
    ));

    let fast = service(FakeRegistrar::new(), store);
    let record = fast.submit(&customer, "cafe-mueller.de", 1).await.unwrap();
    assert_eq!(record.status, RegistrationStatus::Registered);
    assert_eq!(record.supersedes, Some(stuck));
}

#[tokio::test]
async fn test_file_store_keeps_history_across_restarts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("registrations.json");
    let customer = customer("Schmidt Bau GmbH", "DE", Some("handwerker"));

    let first_id = {
        let store = Arc::new(JsonFileRegistrationStore::open(&path).await.unwrap());
        let service = service(FakeRegistrar::new().with_taken(["schmidt-bau.com"]), store);
        let failed = service.submit(&customer, "schmidt-bau.com", 1).await.unwrap();
        assert_eq!(failed.status, RegistrationStatus::Failed);
        failed.id
    };

    let store = Arc::new(JsonFileRegistrationStore::open(&path).await.unwrap());
    assert_eq!(store.backend_name(), "json-file");
    let service = service(FakeRegistrar::new(), store);

    let stored = service.get(first_id).await.unwrap();
    assert_eq!(stored.status, RegistrationStatus::Failed);
    assert!(stored.request_payload.is_some());

    let retry = service.submit(&customer, "schmidt-bau.com", 1).await.unwrap();
    assert_eq!(retry.supersedes, Some(first_id));

    let history = service.list_for_customer(customer.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, retry.id);
}
