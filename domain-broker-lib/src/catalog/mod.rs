//! TLD catalog and registrar price table access.
//!
//! Catalogs are read-only from the request path. The suggestion engine reads
//! one [`CatalogSnapshot`] at the start of each request, so a concurrent
//! catalog update is never observed half-way through scoring.

mod cached;
mod memory;

pub use cached::CachedCatalog;
pub use memory::{default_catalog, InMemoryCatalog};

use crate::error::BrokerError;
use crate::types::{Money, RegistrarPricing, TldRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Read interface over TLD metadata and registrar purchase costs.
#[async_trait]
pub trait TldCatalog: Send + Sync {
    /// Active TLDs ordered by sort order, then TLD string.
    async fn list_active_tlds(&self) -> Result<Vec<TldRecord>, BrokerError>;

    /// All registrar price rows for a TLD (possibly empty).
    async fn get_registrar_pricing(&self, tld: &str) -> Result<Vec<RegistrarPricing>, BrokerError>;

    /// Look up one TLD regardless of its active flag.
    async fn get_tld(&self, tld: &str) -> Result<Option<TldRecord>, BrokerError>;

    /// Read everything a request needs in one go.
    async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, BrokerError> {
        let tlds = self.list_active_tlds().await?;
        let mut pricing = HashMap::with_capacity(tlds.len());
        for record in &tlds {
            let rows = self.get_registrar_pricing(&record.tld).await?;
            pricing.insert(record.tld.clone(), rows);
        }
        Ok(Arc::new(CatalogSnapshot::new(tlds, pricing)))
    }
}

/// Immutable view of the active catalog at one point in time.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    tlds: Vec<TldRecord>,
    pricing: HashMap<String, Vec<RegistrarPricing>>,
    taken_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// Build a snapshot; inactive records are filtered out.
    pub fn new(tlds: Vec<TldRecord>, pricing: HashMap<String, Vec<RegistrarPricing>>) -> Self {
        Self {
            tlds: tlds.into_iter().filter(|t| t.active).collect(),
            pricing,
            taken_at: Utc::now(),
        }
    }

    /// Active TLDs in catalog order.
    pub fn active_tlds(&self) -> &[TldRecord] {
        &self.tlds
    }

    /// Active TLD by name.
    pub fn tld(&self, tld: &str) -> Option<&TldRecord> {
        let tld = normalize_tld(tld);
        self.tlds.iter().find(|t| t.tld == tld)
    }

    /// Sell price of an active TLD.
    pub fn sell_price(&self, tld: &str) -> Result<Money, BrokerError> {
        match self.tld(tld) {
            Some(record) => record.price(),
            None => Err(BrokerError::UnsupportedTld {
                tld: normalize_tld(tld),
            }),
        }
    }

    /// Price row of one registrar for one TLD.
    pub fn registrar_pricing(&self, tld: &str, registrar: &str) -> Option<&RegistrarPricing> {
        self.pricing
            .get(&normalize_tld(tld))?
            .iter()
            .find(|p| p.registrar == registrar)
    }

    /// All price rows of a TLD.
    pub fn pricing_rows(&self, tld: &str) -> &[RegistrarPricing] {
        self.pricing
            .get(&normalize_tld(tld))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// When the snapshot was read.
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn len(&self) -> usize {
        self.tlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tlds.is_empty()
    }
}

/// Lower-case and strip a leading dot (".DE" -> "de").
pub fn normalize_tld(tld: &str) -> String {
    tld.trim().trim_start_matches('.').to_ascii_lowercase()
}
