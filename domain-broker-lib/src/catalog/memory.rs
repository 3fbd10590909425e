//! In-memory catalog, either built in or loaded from a TOML file.
//!
//! File format:
//!
//! ```toml
//! [[tld]]
//! tld = "de"
//! sell_price = "8.99"
//! priority = 100
//! sort_order = 1
//! country = "DE"
//! groups = ["handwerker"]
//!
//! [[pricing]]
//! tld = "de"
//! registrar = "inwx"
//! registration = { cost = "3.50", period_years = 1 }
//! transfer = { cost = "0.00" }
//! renewal = { cost = "3.50" }
//! ```

use super::{normalize_tld, CatalogSnapshot, TldCatalog};
use crate::error::BrokerError;
use crate::types::{Money, PricedOperation, RegistrarPricing, TldRecord};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "tld")]
    tlds: Vec<TldRecord>,
    #[serde(default)]
    pricing: Vec<RegistrarPricing>,
}

#[derive(Debug, Default)]
struct CatalogState {
    tlds: BTreeMap<String, TldRecord>,
    pricing: HashMap<String, Vec<RegistrarPricing>>,
}

/// Catalog held in process memory behind an async lock.
///
/// Updates through [`InMemoryCatalog::upsert_tld`] and
/// [`InMemoryCatalog::set_active`] never affect snapshots already taken.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    /// Build a catalog from records, validating every entry.
    pub fn new(
        tlds: Vec<TldRecord>,
        pricing: Vec<RegistrarPricing>,
    ) -> Result<Self, BrokerError> {
        let mut state = CatalogState::default();

        for mut record in tlds {
            record.tld = validate_tld_name(&record.tld)?;
            if let Some(country) = record.country.as_mut() {
                *country = country.trim().to_ascii_uppercase();
            }
            if record.active && record.sell_price.is_none() {
                warn!(tld = %record.tld, "active TLD has no sell price");
            }
            if state.tlds.contains_key(&record.tld) {
                return Err(BrokerError::config(format!(
                    "TLD '{}' is listed more than once",
                    record.tld
                )));
            }
            state.tlds.insert(record.tld.clone(), record);
        }

        for mut row in pricing {
            row.tld = normalize_tld(&row.tld);
            if !state.tlds.contains_key(&row.tld) {
                return Err(BrokerError::config(format!(
                    "pricing row for unknown TLD '{}'",
                    row.tld
                )));
            }
            if row.registrar.trim().is_empty() {
                return Err(BrokerError::config(format!(
                    "pricing row for '{}' has no registrar",
                    row.tld
                )));
            }
            for (name, op) in [
                ("registration", &row.registration),
                ("transfer", &row.transfer),
                ("renewal", &row.renewal),
            ] {
                if !(1..=10).contains(&op.period_years) {
                    return Err(BrokerError::config(format!(
                        "{} period for '{}' at '{}' must be 1-10 years",
                        name, row.tld, row.registrar
                    )));
                }
            }
            let rows = state.pricing.entry(row.tld.clone()).or_default();
            if rows.iter().any(|r| r.registrar == row.registrar) {
                return Err(BrokerError::config(format!(
                    "duplicate pricing for '{}' at '{}'",
                    row.tld, row.registrar
                )));
            }
            rows.push(row);
        }

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Parse a TOML catalog document.
    pub fn from_toml_str(content: &str) -> Result<Self, BrokerError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::new(file.tlds, file.pricing)
    }

    /// Load a TOML catalog file.
    pub async fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, BrokerError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            BrokerError::file_error(
                path.to_string_lossy(),
                format!("Failed to read catalog: {}", e),
            )
        })?;
        let catalog = Self::from_toml_str(&content).map_err(|e| {
            BrokerError::file_error(path.to_string_lossy(), e.to_string())
        })?;
        debug!(path = %path.display(), "loaded TLD catalog");
        Ok(catalog)
    }

    /// Insert or replace one TLD record.
    pub async fn upsert_tld(&self, mut record: TldRecord) -> Result<(), BrokerError> {
        record.tld = validate_tld_name(&record.tld)?;
        let mut state = self.state.write().await;
        state.tlds.insert(record.tld.clone(), record);
        Ok(())
    }

    /// Toggle the active flag of a known TLD.
    pub async fn set_active(&self, tld: &str, active: bool) -> Result<(), BrokerError> {
        let tld = normalize_tld(tld);
        let mut state = self.state.write().await;
        match state.tlds.get_mut(&tld) {
            Some(record) => {
                record.active = active;
                Ok(())
            }
            None => Err(BrokerError::UnsupportedTld { tld }),
        }
    }
}

#[async_trait]
impl TldCatalog for InMemoryCatalog {
    async fn list_active_tlds(&self) -> Result<Vec<TldRecord>, BrokerError> {
        Ok(active_sorted(&*self.state.read().await))
    }

    async fn get_registrar_pricing(&self, tld: &str) -> Result<Vec<RegistrarPricing>, BrokerError> {
        let state = self.state.read().await;
        Ok(state
            .pricing
            .get(&normalize_tld(tld))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_tld(&self, tld: &str) -> Result<Option<TldRecord>, BrokerError> {
        let state = self.state.read().await;
        Ok(state.tlds.get(&normalize_tld(tld)).cloned())
    }

    /// TLDs and pricing are read under one guard so a concurrent update
    /// lands entirely before or after the snapshot.
    async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, BrokerError> {
        let state = self.state.read().await;
        let tlds = active_sorted(&state);
        let pricing = tlds
            .iter()
            .map(|t| {
                let rows = state.pricing.get(&t.tld).cloned().unwrap_or_default();
                (t.tld.clone(), rows)
            })
            .collect();
        Ok(Arc::new(CatalogSnapshot::new(tlds, pricing)))
    }
}

fn active_sorted(state: &CatalogState) -> Vec<TldRecord> {
    let mut tlds: Vec<TldRecord> = state.tlds.values().filter(|t| t.active).cloned().collect();
    tlds.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.tld.cmp(&b.tld)));
    tlds
}

fn validate_tld_name(tld: &str) -> Result<String, BrokerError> {
    let tld = normalize_tld(tld);
    let valid = !tld.is_empty()
        && !tld.ends_with('.')
        && tld.split('.').all(|part| {
            !part.is_empty()
                && !part.starts_with('-')
                && !part.ends_with('-')
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    if valid {
        Ok(tld)
    } else {
        Err(BrokerError::config(format!("invalid TLD name '{}'", tld)))
    }
}

/// The built-in German-market catalog with INWX purchase costs.
pub fn default_catalog() -> InMemoryCatalog {
    //  tld, price cents, priority, sort, country, groups, active
    let tlds: [(&str, u64, i32, i32, Option<&str>, &[&str], bool); 12] = [
        ("de", 899, 100, 1, Some("DE"), &["handwerker", "haendler", "dienstleister"], true),
        ("com", 1299, 80, 2, None, &["haendler", "dienstleister"], true),
        ("net", 1399, 60, 3, None, &[], true),
        ("eu", 999, 55, 4, None, &["haendler"], true),
        ("at", 1499, 70, 5, Some("AT"), &["handwerker", "haendler"], true),
        ("ch", 1499, 70, 6, Some("CH"), &["handwerker", "haendler"], true),
        ("org", 1499, 50, 7, None, &["verein"], true),
        ("shop", 2999, 45, 8, None, &["haendler"], true),
        ("online", 2499, 40, 9, None, &["dienstleister"], true),
        ("info", 1599, 30, 10, None, &[], true),
        ("berlin", 3499, 35, 11, Some("DE"), &["handwerker"], true),
        ("io", 3999, 65, 12, None, &[], false),
    ];
    //  tld, registration, transfer, renewal (cents, 1 year each)
    let costs: [(&str, u64, u64, u64); 12] = [
        ("de", 350, 0, 350),
        ("com", 820, 820, 820),
        ("net", 990, 990, 990),
        ("eu", 450, 450, 450),
        ("at", 900, 0, 900),
        ("ch", 850, 0, 850),
        ("org", 950, 950, 950),
        ("shop", 1900, 1900, 2600),
        ("online", 1500, 1500, 2500),
        ("info", 1100, 1100, 1700),
        ("berlin", 2500, 2500, 2500),
        ("io", 3200, 3200, 3200),
    ];

    let mut state = CatalogState::default();
    for (tld, cents, priority, sort_order, country, groups, active) in tlds {
        state.tlds.insert(
            tld.to_string(),
            TldRecord {
                tld: tld.to_string(),
                sell_price: Some(Money::from_cents(cents)),
                active,
                sort_order,
                groups: groups.iter().map(|g| g.to_string()).collect(),
                priority,
                country: country.map(str::to_string),
            },
        );
    }
    for (tld, registration, transfer, renewal) in costs {
        let op = |cents| PricedOperation {
            cost: Money::from_cents(cents),
            period_years: 1,
        };
        state.pricing.insert(
            tld.to_string(),
            vec![RegistrarPricing {
                tld: tld.to_string(),
                registrar: "inwx".to_string(),
                registration: op(registration),
                transfer: op(transfer),
                renewal: op(renewal),
            }],
        );
    }

    InMemoryCatalog {
        state: RwLock::new(state),
    }
}
