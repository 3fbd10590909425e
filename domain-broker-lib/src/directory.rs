//! Partner services, customers and caller identity.
//!
//! The broker never creates customers or partners; it only reads them from
//! a directory maintained elsewhere. A caller token is resolved to a partner
//! key by an [`IdentityProvider`], and [`Wizard::start`] ties the three
//! together.

use crate::error::BrokerError;
use crate::types::{Customer, PartnerService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Lookup of partner services by key.
#[async_trait]
pub trait PartnerDirectory: Send + Sync {
    /// Partner by key, active or not.
    async fn partner_by_key(&self, key: &str) -> Result<Option<PartnerService>, BrokerError>;
}

/// Lookup of customers.
///
/// One customer id may exist under several partners; `(id, partner_id)`
/// identifies a single entry.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn fetch(
        &self,
        customer_id: Uuid,
        partner_id: Uuid,
    ) -> Result<Option<Customer>, BrokerError>;

    /// Any entry for this customer id, lowest partner id first.
    async fn fetch_any(&self, customer_id: Uuid) -> Result<Option<Customer>, BrokerError>;
}

/// Resolves caller tokens to partner service keys.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<String, BrokerError>;
}

/// Token table from configuration. Unknown tokens are rejected.
#[derive(Clone, Default)]
pub struct StaticTokenIdentity {
    tokens: BTreeMap<String, String>,
}

impl std::fmt::Debug for StaticTokenIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenIdentity")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl StaticTokenIdentity {
    pub fn new(tokens: BTreeMap<String, String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn resolve(&self, token: &str) -> Result<String, BrokerError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BrokerError::Unauthorized {
                message: "missing token".to_string(),
            });
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| BrokerError::Unauthorized {
                message: "unknown token".to_string(),
            })
    }
}

/// Shape of a directory file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    partner: Vec<PartnerService>,
    #[serde(default)]
    customer: Vec<Customer>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    partners: HashMap<String, PartnerService>,
    customers: BTreeMap<(Uuid, Uuid), Customer>,
}

/// Partners and customers held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    /// Build a directory, rejecting duplicate keys and dangling partner ids.
    pub fn new(
        partners: Vec<PartnerService>,
        customers: Vec<Customer>,
    ) -> Result<Self, BrokerError> {
        let mut state = DirectoryState::default();

        for partner in partners {
            let key = partner.key.trim().to_string();
            if key.is_empty() {
                return Err(BrokerError::config("partner key cannot be empty"));
            }
            if state.partners.values().any(|p| p.id == partner.id) {
                return Err(BrokerError::config(format!(
                    "duplicate partner id {}",
                    partner.id
                )));
            }
            if let Some(token) = partner.auth_token.as_deref() {
                let token = token.trim();
                if token.is_empty() {
                    return Err(BrokerError::config(format!(
                        "partner '{}' has an empty auth_token",
                        key
                    )));
                }
                if state
                    .partners
                    .values()
                    .any(|p| p.auth_token.as_deref().map(str::trim) == Some(token))
                {
                    return Err(BrokerError::config(format!(
                        "partner '{}' reuses another partner's auth_token",
                        key
                    )));
                }
            }
            if state.partners.insert(key.clone(), partner).is_some() {
                return Err(BrokerError::config(format!("duplicate partner key '{}'", key)));
            }
        }

        for customer in customers {
            if !state.partners.values().any(|p| p.id == customer.partner_id) {
                return Err(BrokerError::config(format!(
                    "customer {} references unknown partner {}",
                    customer.id, customer.partner_id
                )));
            }
            let pair = (customer.id, customer.partner_id);
            if state.customers.insert(pair, customer).is_some() {
                return Err(BrokerError::config(format!(
                    "customer {} listed twice for partner {}",
                    pair.0, pair.1
                )));
            }
        }

        debug!(
            partners = state.partners.len(),
            customers = state.customers.len(),
            "directory loaded"
        );
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Parse `[[partner]]` and `[[customer]]` tables.
    pub fn from_toml_str(content: &str) -> Result<Self, BrokerError> {
        let file: DirectoryFile = toml::from_str(content)?;
        Self::new(file.partner, file.customer)
    }

    pub async fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, BrokerError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            BrokerError::file_error(
                path.to_string_lossy(),
                format!("Failed to read directory file: {}", e),
            )
        })?;
        Self::from_toml_str(&content)
    }

    /// Token table of partners that carry an `auth_token`.
    pub async fn partner_tokens(&self) -> BTreeMap<String, String> {
        self.state
            .read()
            .await
            .partners
            .iter()
            .filter_map(|(key, p)| {
                p.auth_token
                    .as_deref()
                    .map(|token| (token.trim().to_string(), key.clone()))
            })
            .collect()
    }

    /// Apply an upstream sync of one customer entry.
    pub async fn upsert_customer(&self, customer: Customer) -> Result<(), BrokerError> {
        let mut state = self.state.write().await;
        if !state.partners.values().any(|p| p.id == customer.partner_id) {
            return Err(BrokerError::config(format!(
                "customer {} references unknown partner {}",
                customer.id, customer.partner_id
            )));
        }
        state
            .customers
            .insert((customer.id, customer.partner_id), customer);
        Ok(())
    }
}

#[async_trait]
impl PartnerDirectory for InMemoryDirectory {
    async fn partner_by_key(&self, key: &str) -> Result<Option<PartnerService>, BrokerError> {
        Ok(self.state.read().await.partners.get(key.trim()).cloned())
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryDirectory {
    async fn fetch(
        &self,
        customer_id: Uuid,
        partner_id: Uuid,
    ) -> Result<Option<Customer>, BrokerError> {
        Ok(self
            .state
            .read()
            .await
            .customers
            .get(&(customer_id, partner_id))
            .cloned())
    }

    async fn fetch_any(&self, customer_id: Uuid) -> Result<Option<Customer>, BrokerError> {
        let state = self.state.read().await;
        Ok(state
            .customers
            .range((customer_id, Uuid::nil())..=(customer_id, Uuid::from_u128(u128::MAX)))
            .next()
            .map(|(_, c)| c.clone()))
    }
}

/// Everything the wizard UI needs to render for one customer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WizardSession {
    pub customer: Customer,
    pub partner: PartnerService,
}

/// Entry point of the white-labelled registration wizard.
#[derive(Clone)]
pub struct Wizard {
    identity: Arc<dyn IdentityProvider>,
    partners: Arc<dyn PartnerDirectory>,
    customers: Arc<dyn CustomerDirectory>,
}

impl Wizard {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        partners: Arc<dyn PartnerDirectory>,
        customers: Arc<dyn CustomerDirectory>,
    ) -> Self {
        Self {
            identity,
            partners,
            customers,
        }
    }

    /// Resolve the caller's partner and load the customer under it.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for an unknown token, `PartnerNotFound` for a missing
    /// or inactive partner, `CustomerNotFound` when the customer is not
    /// associated with that partner.
    pub async fn start(&self, token: &str, customer_id: Uuid) -> Result<WizardSession, BrokerError> {
        let key = self.identity.resolve(token).await?;

        let partner = self
            .partners
            .partner_by_key(&key)
            .await?
            .filter(|p| p.active)
            .ok_or_else(|| BrokerError::PartnerNotFound { key: key.clone() })?;

        let customer = self
            .customers
            .fetch(customer_id, partner.id)
            .await?
            .ok_or_else(|| BrokerError::CustomerNotFound {
                customer_id,
                partner: Some(partner.key.clone()),
            })?;

        info!(partner = %partner.key, customer_id = %customer.id, "wizard started");
        Ok(WizardSession { customer, partner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTORY: &str = r#"
[[partner]]
id = "6f1c2d3e-0000-4000-8000-000000000001"
key = "handwerker24"
name = "Handwerker24"

[[partner]]
id = "6f1c2d3e-0000-4000-8000-000000000002"
key = "altportal"
name = "Altes Portal"
active = false
auth_token = "tok-alt-dir"

[[customer]]
id = "a0000000-0000-4000-8000-000000000001"
partner_id = "6f1c2d3e-0000-4000-8000-000000000001"
name = "Schmidt Bau GmbH"
email = "info@schmidt-bau.de"
country = "DE"
industry = "handwerker"

[[customer]]
id = "a0000000-0000-4000-8000-000000000001"
partner_id = "6f1c2d3e-0000-4000-8000-000000000002"
name = "Schmidt Bau GmbH"
email = "info@schmidt-bau.de"
country = "DE"
"#;

    fn schmidt() -> Uuid {
        "a0000000-0000-4000-8000-000000000001".parse().unwrap()
    }

    fn wizard() -> Wizard {
        let directory = Arc::new(InMemoryDirectory::from_toml_str(DIRECTORY).unwrap());
        let identity = StaticTokenIdentity::new(BTreeMap::from([
            ("tok-hw".to_string(), "handwerker24".to_string()),
            ("tok-alt".to_string(), "altportal".to_string()),
            ("tok-gone".to_string(), "nirgendwo".to_string()),
        ]));
        Wizard::new(Arc::new(identity), directory.clone(), directory)
    }

    #[tokio::test]
    async fn test_start_returns_customer_and_partner() {
        let session = wizard().start("tok-hw", schmidt()).await.unwrap();
        assert_eq!(session.partner.key, "handwerker24");
        assert_eq!(session.customer.industry.as_deref(), Some("handwerker"));
        assert_eq!(session.customer.partner_id, session.partner.id);
    }

    #[tokio::test]
    async fn test_start_error_taxonomy() {
        let wizard = wizard();

        assert!(matches!(
            wizard.start("nope", schmidt()).await,
            Err(BrokerError::Unauthorized { .. })
        ));
        assert!(matches!(
            wizard.start("tok-alt", schmidt()).await,
            Err(BrokerError::PartnerNotFound { .. })
        ));
        assert!(matches!(
            wizard.start("tok-gone", schmidt()).await,
            Err(BrokerError::PartnerNotFound { .. })
        ));
        assert!(matches!(
            wizard.start("tok-hw", Uuid::new_v4()).await,
            Err(BrokerError::CustomerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_any_and_pairs() {
        let directory = InMemoryDirectory::from_toml_str(DIRECTORY).unwrap();
        let any = directory.fetch_any(schmidt()).await.unwrap().unwrap();
        assert_eq!(
            any.partner_id,
            "6f1c2d3e-0000-4000-8000-000000000001".parse::<Uuid>().unwrap()
        );
        assert!(directory.fetch_any(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partner_tokens_open_the_wizard() {
        let directory = Arc::new(
            InMemoryDirectory::from_toml_str(&DIRECTORY.replacen(
                "name = \"Handwerker24\"",
                "name = \"Handwerker24\"\nauth_token = \"tok-hw-dir\"",
                1,
            ))
            .unwrap(),
        );
        let tokens = directory.partner_tokens().await;
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens["tok-hw-dir"], "handwerker24");

        let wizard = Wizard::new(
            Arc::new(StaticTokenIdentity::new(tokens)),
            directory.clone(),
            directory,
        );
        let session = wizard.start("tok-hw-dir", schmidt()).await.unwrap();
        assert_eq!(session.partner.key, "handwerker24");

        // The token never leaves the broker.
        let json = serde_json::to_string(&session).unwrap();
        assert!(!json.contains("tok-hw-dir"));
        assert!(!format!("{:?}", session.partner).contains("tok-hw-dir"));
        assert!(matches!(
            wizard.start("tok-alt-dir", schmidt()).await,
            Err(BrokerError::PartnerNotFound { .. })
        ));
    }

    #[test]
    fn test_shared_partner_token_is_rejected() {
        let content = DIRECTORY.replacen(
            "name = \"Handwerker24\"",
            "name = \"Handwerker24\"\nauth_token = \"tok-alt-dir\"",
            1,
        );
        let err = InMemoryDirectory::from_toml_str(&content).unwrap_err();
        assert!(err.to_string().contains("auth_token"));
    }

    #[test]
    fn test_dangling_partner_is_rejected() {
        let content = r#"
[[customer]]
id = "a0000000-0000-4000-8000-000000000009"
partner_id = "6f1c2d3e-0000-4000-8000-000000000009"
name = "Niemand"
email = "n@example.de"
country = "DE"
"#;
        assert!(InMemoryDirectory::from_toml_str(content).is_err());
    }
}
