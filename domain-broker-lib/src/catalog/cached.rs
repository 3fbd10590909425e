//! Short-TTL snapshot cache in front of any catalog.

use super::{normalize_tld, CatalogSnapshot, TldCatalog};
use crate::error::BrokerError;
use crate::types::{RegistrarPricing, TldRecord};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct CacheEntry {
    snapshot: Arc<CatalogSnapshot>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_stale(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() > ttl
    }
}

/// Wraps a catalog and serves snapshots from memory until they expire.
///
/// Concurrent callers that hit an expired entry wait for a single reload.
pub struct CachedCatalog<C> {
    inner: C,
    ttl: Duration,
    entry: Mutex<Option<CacheEntry>>,
}

impl<C: TldCatalog> CachedCatalog<C> {
    pub fn new(inner: C, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Drop the cached snapshot so the next read goes to the source.
    pub async fn invalidate(&self) {
        *self.entry.lock().await = None;
    }

    /// The wrapped catalog.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: TldCatalog> TldCatalog for CachedCatalog<C> {
    async fn list_active_tlds(&self) -> Result<Vec<TldRecord>, BrokerError> {
        Ok(self.snapshot().await?.active_tlds().to_vec())
    }

    async fn get_registrar_pricing(&self, tld: &str) -> Result<Vec<RegistrarPricing>, BrokerError> {
        let snapshot = self.snapshot().await?;
        let tld = normalize_tld(tld);
        if snapshot.tld(&tld).is_some() {
            Ok(snapshot.pricing_rows(&tld).to_vec())
        } else {
            // Inactive TLDs are not part of the snapshot.
            self.inner.get_registrar_pricing(&tld).await
        }
    }

    async fn get_tld(&self, tld: &str) -> Result<Option<TldRecord>, BrokerError> {
        self.inner.get_tld(tld).await
    }

    async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, BrokerError> {
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            if !cached.is_stale(self.ttl) {
                return Ok(Arc::clone(&cached.snapshot));
            }
        }

        let snapshot = self.inner.snapshot().await?;
        debug!(tlds = snapshot.len(), "refreshed catalog snapshot");
        *entry = Some(CacheEntry {
            snapshot: Arc::clone(&snapshot),
            fetched_at: Instant::now(),
        });
        Ok(snapshot)
    }
}
