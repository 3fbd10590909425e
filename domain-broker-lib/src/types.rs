//! Core data types for suggestions, pricing and registration records.
//!
//! This module defines the data model shared by the catalog, the suggestion
//! engine, the registrar gateway and the registration recorder.

use crate::error::BrokerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A non-negative monetary amount with exactly two decimal places.
///
/// Construction rounds to cents (banker's rounding is not used; midpoints
/// round away from zero) and rejects negative values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Validate and normalize an amount.
    pub fn new(value: Decimal) -> Result<Self, BrokerError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(BrokerError::config(format!(
                "monetary amount must not be negative: {}",
                value
            )));
        }
        let mut rounded =
            value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(2);
        Ok(Self(rounded))
    }

    /// Build an amount from integer cents (`899` → `8.99`).
    pub fn from_cents(cents: u64) -> Self {
        Self(Decimal::new(cents as i64, 2))
    }

    /// The underlying decimal value.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Amount for a multi-year term.
    pub fn times(&self, years: u8) -> Money {
        let mut total = self.0 * Decimal::from(years);
        total.rescale(2);
        Money(total)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = BrokerError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tenant: an embedding portal that white-labels the wizard.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct PartnerService {
    pub id: Uuid,
    /// Unique key, e.g. "handwerker24"
    pub key: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Bearer token the portal presents when it opens the wizard.
    /// Read from directory files, never written back out.
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
    /// White-label configuration blob, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelabel: Option<serde_json::Value>,
}

impl fmt::Debug for PartnerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartnerService")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("name", &self.name)
            .field("active", &self.active)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("whitelabel", &self.whitelabel)
            .finish()
    }
}

/// End customer, identified by an id issued by the upstream company registry.
///
/// A customer may be associated with several partner services; the pair
/// (`id`, `partner_id`) is unique, `id` alone is not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub name: String,
    pub email: String,
    /// ISO 3166-1 alpha-2
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

/// Per-TLD catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TldRecord {
    /// TLD without leading dot, lower case ("de", "com")
    pub tld: String,
    /// Customer-facing price; a missing price makes the TLD unsellable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_price: Option<Money>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub sort_order: i32,
    /// Thematic group tags matched against the customer's industry
    #[serde(default)]
    pub groups: Vec<String>,
    /// Ranking priority; higher ranks first
    #[serde(default)]
    pub priority: i32,
    /// Country association (ISO alpha-2) for the country-relevance bonus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl TldRecord {
    /// Resolve the sell price or fail with `UnresolvablePrice`.
    pub fn price(&self) -> Result<Money, BrokerError> {
        self.sell_price.ok_or_else(|| BrokerError::UnresolvablePrice {
            tld: self.tld.clone(),
        })
    }

    /// Whether this TLD is associated with the given country code.
    pub fn matches_country(&self, country: &str) -> bool {
        self.country
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(country.trim()))
    }

    /// Whether one of this TLD's group tags equals the industry tag.
    pub fn matches_industry(&self, industry: &str) -> bool {
        let industry = industry.trim();
        !industry.is_empty() && self.groups.iter().any(|g| g.eq_ignore_ascii_case(industry))
    }
}

/// Cost and contract length of one registrar operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricedOperation {
    pub cost: Money,
    #[serde(default = "default_period")]
    pub period_years: u8,
}

/// Purchase cost of a TLD at one registrar.
///
/// No row for a (tld, registrar) pair means the registrar cannot sell the TLD.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrarPricing {
    pub tld: String,
    pub registrar: String,
    pub registration: PricedOperation,
    pub transfer: PricedOperation,
    pub renewal: PricedOperation,
}

/// Availability state of a suggested or checked domain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Unavailable,
    Unknown,
}

impl Availability {
    /// `Some(true)` / `Some(false)` / `None` view used for display.
    pub fn as_option(&self) -> Option<bool> {
        match self {
            Availability::Available => Some(true),
            Availability::Unavailable => Some(false),
            Availability::Unknown => None,
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available => write!(f, "available"),
            Availability::Unavailable => write!(f, "unavailable"),
            Availability::Unknown => write!(f, "unknown"),
        }
    }
}

/// Opaque audit blob with a schema version tag.
///
/// Never parsed for business decisions; kept for human inspection only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditPayload {
    pub schema_version: u16,
    pub body: String,
}

impl AuditPayload {
    /// Current schema version for payloads written by this crate.
    pub const SCHEMA_VERSION: u16 = 1;

    /// Wrap a JSON value.
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION,
            body: value.to_string(),
        }
    }

    /// Wrap free text.
    pub fn from_text<T: Into<String>>(body: T) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION,
            body: body.into(),
        }
    }
}

/// Input of one suggestion request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SuggestionRequest {
    pub business_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl SuggestionRequest {
    /// Create a request for a business name.
    pub fn new<N: Into<String>>(business_name: N) -> Self {
        Self {
            business_name: business_name.into(),
            ..Default::default()
        }
    }

    /// Set the customer's country code.
    pub fn with_country<C: Into<String>>(mut self, country: C) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Set the customer's industry tag.
    pub fn with_industry<I: Into<String>>(mut self, industry: I) -> Self {
        self.industry = Some(industry.into());
        self
    }

    /// Set the maximum number of suggestions.
    ///
    /// The engine clamps this into `1..=max_limit`, so `0` still returns one.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Fill country and industry from a customer profile when not set explicitly.
    pub fn for_customer(mut self, customer: &Customer) -> Self {
        if self.country.is_none() {
            self.country = Some(customer.country.clone());
        }
        if self.industry.is_none() {
            self.industry = customer.industry.clone();
        }
        self
    }
}

/// One ranked, priced, availability-annotated suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    /// Full domain, e.g. "cafe-mueller.de"
    pub domain: String,
    /// Label part without TLD
    pub label: String,
    pub tld: String,
    pub score: i64,
    pub price: Money,
    pub availability: Availability,
    /// Bare label on a high-priority TLD
    pub recommended: bool,
    /// Generated variant rather than the bare label
    #[serde(default)]
    pub variant: bool,
}

impl Suggestion {
    /// Convenience view of the availability state.
    pub fn available(&self) -> Option<bool> {
        self.availability.as_option()
    }
}

/// Result of a suggestion request.
///
/// `availability_error` is set when the registrar could not be consulted;
/// in that case suggestions are still returned with unknown availability.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionResponse {
    /// Normalized label the candidates were built from
    pub label: String,
    pub suggestions: Vec<Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_error: Option<BrokerError>,
}

impl SuggestionResponse {
    /// Whether availability enrichment degraded to unknown.
    pub fn is_degraded(&self) -> bool {
        self.availability_error.is_some()
    }
}

/// Result of checking one full domain directly.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckResult {
    pub domain: String,
    pub availability: Availability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Lifecycle state of a registration attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Registered,
    Failed,
    Cancelled,
}

impl RegistrationStatus {
    /// Whether the single allowed transition out of `Pending` already happened.
    pub fn is_final(&self) -> bool {
        !matches!(self, RegistrationStatus::Pending)
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationStatus::Pending => write!(f, "pending"),
            RegistrationStatus::Registered => write!(f, "registered"),
            RegistrationStatus::Failed => write!(f, "failed"),
            RegistrationStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Registrar's verdict on a registration submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionOutcome {
    Accepted,
    Rejected,
    Error,
}

impl SubmissionOutcome {
    /// Record status this outcome finalizes to.
    pub fn final_status(&self) -> RegistrationStatus {
        match self {
            SubmissionOutcome::Accepted => RegistrationStatus::Registered,
            SubmissionOutcome::Rejected | SubmissionOutcome::Error => RegistrationStatus::Failed,
        }
    }
}

/// Outcome of `register_domain` with verbatim payloads for audit storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationResult {
    pub outcome: SubmissionOutcome,
    pub raw_request: AuditPayload,
    pub raw_response: AuditPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Ownership metadata sent along with a registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerMeta {
    pub customer_id: Uuid,
    pub name: String,
    pub email: String,
    pub country: String,
    /// Registrar-side contact handle, when one exists for this owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_handle: Option<String>,
}

impl From<&Customer> for OwnerMeta {
    fn from(customer: &Customer) -> Self {
        Self {
            customer_id: customer.id,
            name: customer.name.clone(),
            email: customer.email.clone(),
            country: customer.country.clone(),
            contact_handle: None,
        }
    }
}

/// The chosen domain handed to the recorder's `create`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainCandidate {
    pub label: String,
    pub tld: String,
    pub sell_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_cost: Option<Money>,
    #[serde(default = "default_period")]
    pub period_years: u8,
}

impl DomainCandidate {
    /// Full domain string.
    pub fn domain(&self) -> String {
        format!("{}.{}", self.label, self.tld)
    }
}

/// One attempt to acquire a specific domain for one customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationRecord {
    pub id: Uuid,
    pub customer_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<Uuid>,
    pub label: String,
    pub tld: String,
    pub domain: String,
    pub sell_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_cost: Option<Money>,
    pub period_years: u8,
    pub status: RegistrationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_payload: Option<AuditPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_payload: Option<AuditPayload>,
    /// Last infrastructure problem observed while pending (timeouts etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Earlier failed or cancelled record for the same customer and domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

fn default_period() -> u8 {
    1
}
