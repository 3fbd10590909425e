//! Suggestion engine.
//!
//! One request reads one catalog snapshot, scores every candidate, keeps
//! the top N and enriches them with a single batched availability check.
//! Availability is best effort: a registrar outage yields `unknown`
//! entries plus `availability_error`, never a failed request.

use crate::catalog::{CatalogSnapshot, TldCatalog};
use crate::config::{ScoringConfig, SuggestionConfig};
use crate::error::BrokerError;
use crate::gateway::{AvailabilityReport, DomainCheck, RegistrarGateway};
use crate::generate::generate_variants;
use crate::normalize::{normalize_label, split_domain};
use crate::scoring::{is_recommended, rank_order, score, ScoredCandidate};
use crate::types::{Availability, CheckResult, Suggestion, SuggestionRequest, SuggestionResponse};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// Builds ranked, priced and availability-annotated domain suggestions.
///
/// # Example
///
/// ```rust,no_run
/// use domain_broker_lib::{default_catalog, FakeRegistrar, SuggestionEngine, SuggestionRequest};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = SuggestionEngine::new(Arc::new(default_catalog()), Arc::new(FakeRegistrar::new()));
///     let response = engine
///         .suggest(SuggestionRequest::new("Café Müller").with_country("DE").with_limit(3))
///         .await?;
///     for s in &response.suggestions {
///         println!("{} {} {}", s.domain, s.price, s.availability);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct SuggestionEngine {
    catalog: Arc<dyn TldCatalog>,
    gateway: Arc<dyn RegistrarGateway>,
    suggestion: SuggestionConfig,
    scoring: ScoringConfig,
    timeout: Duration,
}

impl SuggestionEngine {
    /// Create an engine with default suggestion and scoring settings.
    pub fn new(catalog: Arc<dyn TldCatalog>, gateway: Arc<dyn RegistrarGateway>) -> Self {
        Self {
            catalog,
            gateway,
            suggestion: SuggestionConfig::default(),
            scoring: ScoringConfig::default(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_suggestion_config(mut self, config: SuggestionConfig) -> Self {
        self.suggestion = config;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    /// Upper bound for the whole availability enrichment, retry included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Suggest domains for a business name.
    ///
    /// The requested limit is clamped, see [`SuggestionConfig::effective_limit`].
    ///
    /// # Errors
    ///
    /// * `InvalidName` if the name has no usable characters (no network call is made)
    /// * `CatalogUnavailable` if TLD data cannot be read
    /// * `UnresolvablePrice` if an active TLD has no sell price
    pub async fn suggest(
        &self,
        request: SuggestionRequest,
    ) -> Result<SuggestionResponse, BrokerError> {
        let label = normalize_label(&request.business_name)?;
        let limit = self.suggestion.effective_limit(request.limit);
        let snapshot = self.snapshot().await?;

        let mut labels = vec![(label.clone(), false)];
        if self.suggestion.variants {
            labels.extend(
                generate_variants(&label, request.industry.as_deref(), &self.suggestion)
                    .into_iter()
                    .map(|v| (v, true)),
            );
        }

        let mut candidates = Vec::with_capacity(snapshot.len() * labels.len());
        for record in snapshot.active_tlds() {
            let price = record.price()?;
            for (candidate_label, variant) in &labels {
                candidates.push(ScoredCandidate {
                    label: candidate_label.clone(),
                    tld: record.tld.clone(),
                    domain: format!("{}.{}", candidate_label, record.tld),
                    score: score(
                        record,
                        request.country.as_deref(),
                        request.industry.as_deref(),
                        *variant,
                        &self.scoring,
                    ),
                    price,
                    priority: record.priority,
                    variant: *variant,
                });
            }
        }

        candidates.sort_by(rank_order);
        candidates.truncate(limit);
        debug!(label = %label, candidates = candidates.len(), limit, "ranked candidates");

        let domains: BTreeSet<String> = candidates.iter().map(|c| c.domain.clone()).collect();
        let (report, availability_error) = self.check_batch(&domains).await;

        let suggestions = candidates
            .into_iter()
            .map(|c| {
                let availability = report
                    .get(&c.domain)
                    .map(|check| check.availability)
                    .unwrap_or(Availability::Unknown);
                Suggestion {
                    recommended: is_recommended(&c, &self.scoring),
                    domain: c.domain,
                    label: c.label,
                    tld: c.tld,
                    score: c.score,
                    price: c.price,
                    availability,
                    variant: c.variant,
                }
            })
            .collect();

        Ok(SuggestionResponse {
            label,
            suggestions,
            availability_error,
        })
    }

    /// Check full domain names directly, annotated with catalog prices.
    ///
    /// Results keep the input order with duplicates removed. Domains on
    /// TLDs the catalog does not offer are still checked but carry no price.
    pub async fn check(&self, domains: &[String]) -> Result<Vec<CheckResult>, BrokerError> {
        let mut ordered = Vec::with_capacity(domains.len());
        let mut seen = BTreeSet::new();
        for input in domains {
            let (label, tld) = split_domain(input)?;
            let domain = format!("{}.{}", label, tld);
            if seen.insert(domain.clone()) {
                ordered.push((domain, tld));
            }
        }

        let snapshot = self.snapshot().await?;
        let (report, availability_error) = self.check_batch(&seen).await;
        let batch_note = availability_error.map(|e| e.to_string());

        Ok(ordered
            .into_iter()
            .map(|(domain, tld)| {
                let check = report.get(&domain);
                let price = snapshot.tld(&tld).and_then(|r| r.sell_price);
                let error = match (price, check.and_then(|c| c.error.clone())) {
                    (None, _) => Some(format!("TLD '{}' is not offered", tld)),
                    (Some(_), Some(e)) => Some(e),
                    (Some(_), None) => batch_note.clone(),
                };
                CheckResult {
                    availability: check
                        .map(|c| c.availability)
                        .unwrap_or(Availability::Unknown),
                    domain,
                    price,
                    error,
                }
            })
            .collect())
    }

    async fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, BrokerError> {
        self.catalog.snapshot().await.map_err(|e| match e {
            BrokerError::CatalogUnavailable { .. } => e,
            other => BrokerError::catalog(other.to_string()),
        })
    }

    /// One batched check plus one retry, both inside the same deadline.
    ///
    /// The retry covers either the whole batch (transient batch failure) or
    /// only the domains reported as transiently unknown, never both.
    async fn check_batch(
        &self,
        domains: &BTreeSet<String>,
    ) -> (AvailabilityReport, Option<BrokerError>) {
        if domains.is_empty() {
            return (AvailabilityReport::new(), None);
        }

        let deadline = Instant::now() + self.timeout;
        let mut retried = false;
        let first = match self.run_check(domains, deadline).await {
            Err(e) if is_transient(&e) => {
                debug!(error = %e, domains = domains.len(), "availability batch failed, retrying once");
                retried = true;
                self.run_check(domains, deadline).await
            }
            other => other,
        };

        let mut report = match first {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, domains = domains.len(), "availability check failed, reporting unknown");
                let report = domains
                    .iter()
                    .map(|d| (d.clone(), DomainCheck::unknown(e.to_string(), false)))
                    .collect();
                return (report, Some(e));
            }
        };

        let retry: BTreeSet<String> = domains
            .iter()
            .filter(|d| report.get(*d).map_or(true, DomainCheck::needs_retry))
            .cloned()
            .collect();

        if !retried && !retry.is_empty() {
            debug!(count = retry.len(), "retrying transient availability failures");
            match self.run_check(&retry, deadline).await {
                Ok(second) => {
                    for (domain, check) in second {
                        if retry.contains(&domain) {
                            report.insert(domain, check);
                        }
                    }
                }
                Err(e) => warn!(error = %e, count = retry.len(), "availability retry failed"),
            }
        }

        for domain in domains {
            report
                .entry(domain.clone())
                .or_insert_with(|| DomainCheck::unknown("missing from registrar response", false));
        }

        (report, None)
    }

    async fn run_check(
        &self,
        domains: &BTreeSet<String>,
        deadline: Instant,
    ) -> Result<AvailabilityReport, BrokerError> {
        match timeout_at(deadline, self.gateway.check_availability(domains)).await {
            Ok(result) => result,
            Err(_) => Err(BrokerError::timeout("domain.check", self.timeout)),
        }
    }
}

/// A failed batch worth asking again. A timeout has used up the deadline.
fn is_transient(error: &BrokerError) -> bool {
    error.is_retryable() && !matches!(error, BrokerError::RegistrarTimeout { .. })
}
