//! # Domain Broker Library
//!
//! Domain suggestion, pricing and registration brokering for partner portals
//! that white-label a registration wizard for their customers.
//!
//! A business name is normalized into a domain label, combined with every
//! active TLD of the catalog, ranked, priced and checked for availability in
//! one batch. A chosen domain is then registered through the configured
//! registrar, with every attempt bookkept before the registrar is called.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_broker_lib::{default_catalog, FakeRegistrar, SuggestionEngine, SuggestionRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = SuggestionEngine::new(Arc::new(default_catalog()), Arc::new(FakeRegistrar::new()));
//!     let response = engine.suggest(SuggestionRequest::new("Schmidt Bau GmbH")).await?;
//!
//!     for s in response.suggestions {
//!         println!("{} {} EUR ({})", s.domain, s.price, s.availability);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Deterministic ranking**: identical inputs and state give identical output
//! - **Best-effort availability**: registrar outages degrade to `unknown`
//! - **Audit trail**: pending records are written before any registrar call
//! - **Pluggable backends**: catalog, registrar, stores and directory are traits

// Re-export main public API types and functions
pub use catalog::{
    default_catalog, normalize_tld, CachedCatalog, CatalogSnapshot, InMemoryCatalog, TldCatalog,
};
pub use config::{
    load_env_config, BrokerConfig, ConfigManager, EnvConfig, FileConfig, RegistrarConfig,
    RegistrarMode, ScoringConfig, StorageConfig, SuggestionConfig,
};
pub use directory::{
    CustomerDirectory, IdentityProvider, InMemoryDirectory, PartnerDirectory,
    StaticTokenIdentity, Wizard, WizardSession,
};
pub use engine::SuggestionEngine;
pub use error::BrokerError;
pub use gateway::{
    build_gateway, AvailabilityReport, DomainCheck, FakeRegistrar, JsonRpcGateway,
    RegistrarGateway,
};
pub use normalize::{normalize_label, split_domain};
pub use registration::{
    JsonFileRegistrationStore, MemoryRegistrationStore, RegistrationRecorder,
    RegistrationService, RegistrationStore, Transition,
};
pub use types::{
    AuditPayload, Availability, CheckResult, Customer, DomainCandidate, Money, OwnerMeta,
    PartnerService, PricedOperation, RegistrarPricing, RegistrationRecord, RegistrationResult,
    RegistrationStatus, SubmissionOutcome, Suggestion, SuggestionRequest, SuggestionResponse,
    TldRecord,
};

// Public modules
pub mod config;
pub mod generate;
pub mod normalize;
pub mod scoring;

// Internal modules, exposed through the re-exports above
mod catalog;
mod directory;
mod engine;
mod error;
mod gateway;
mod registration;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, BrokerError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
    }
}

/// Information about the library build
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
}
