//! Domain Broker CLI Application
//!
//! Command-line front end for domain-broker-lib: domain suggestions,
//! direct availability checks, registration submission and record
//! inspection, plus the wizard entry point for partner portals.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use domain_broker_lib::config::parse_timeout_string;
use domain_broker_lib::{
    build_gateway, default_catalog, load_env_config, BrokerConfig, BrokerError, CachedCatalog,
    ConfigManager, CustomerDirectory, InMemoryCatalog, InMemoryDirectory,
    JsonFileRegistrationStore, MemoryRegistrationStore, RegistrarMode, RegistrationRecorder,
    RegistrationService, RegistrationStore, StaticTokenIdentity, SuggestionEngine,
    SuggestionRequest, TldCatalog, Wizard,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for domain-broker
#[derive(Parser, Debug)]
#[command(name = "domain-broker")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Suggest, price and register domains for partner portal customers")]
#[command(
    long_about = "Suggest, price and register domains for partner portal customers.\n\nSuggestions are ranked by TLD priority, country and industry fit, priced from the TLD catalog and checked for availability in one registrar round trip."
)]
#[command(styles = STYLES)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", global = true, help_heading = "Configuration")]
    pub config: Option<PathBuf>,

    /// Registrar backend: fake, ote or production
    #[arg(long = "registrar-mode", value_name = "MODE", global = true, help_heading = "Configuration")]
    pub registrar_mode: Option<RegistrarMode>,

    /// Registrar timeout, e.g. "800ms", "5s"
    #[arg(long = "timeout", value_name = "DURATION", global = true, help_heading = "Configuration")]
    pub timeout: Option<String>,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", global = true, help_heading = "Output Format")]
    pub json: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", global = true, help_heading = "Output Format")]
    pub verbose: bool,

    /// Show debug logging
    #[arg(short = 'd', long = "debug", global = true, help_heading = "Output Format")]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Suggest domains for a business name
    Suggest {
        /// Business name, e.g. "Café Müller GmbH"
        #[arg(value_name = "NAME")]
        name: String,

        /// Customer country (ISO alpha-2)
        #[arg(long = "country", value_name = "CC")]
        country: Option<String>,

        /// Customer industry tag
        #[arg(long = "industry", value_name = "TAG")]
        industry: Option<String>,

        /// Maximum number of suggestions, clamped to 1..=suggestion.max_limit
        #[arg(short = 'n', long = "limit", value_name = "N")]
        limit: Option<usize>,

        /// Also suggest generated name variants
        #[arg(long = "variants")]
        variants: bool,
    },

    /// Check availability and price of full domain names
    Check {
        #[arg(value_name = "DOMAIN", required = true)]
        domains: Vec<String>,
    },

    /// Register a domain for a customer
    Register {
        /// Customer id
        #[arg(long = "customer", value_name = "ID")]
        customer: Uuid,

        /// Full domain, e.g. "schmidt-bau.de"
        #[arg(long = "domain", value_name = "FQDN")]
        domain: String,

        /// Contract period in years
        #[arg(long = "period", value_name = "YEARS", default_value_t = 1)]
        period: u8,

        /// Partner token; restricts the customer lookup to that partner
        #[arg(long = "token", value_name = "TOKEN")]
        token: Option<String>,
    },

    /// Withdraw a pending registration
    Cancel {
        #[arg(value_name = "RECORD_ID")]
        record: Uuid,

        /// Reason stored on the record
        #[arg(long = "reason")]
        reason: Option<String>,
    },

    /// List registration records
    Records {
        /// Records of one customer
        #[arg(long = "customer", value_name = "ID")]
        customer: Option<Uuid>,

        /// Only records still waiting for a registrar outcome
        #[arg(long = "pending")]
        pending: bool,
    },

    /// Resolve a partner token and customer for the wizard
    WizardStart {
        #[arg(long = "token", value_name = "TOKEN")]
        token: String,

        #[arg(long = "customer", value_name = "ID")]
        customer: Uuid,
    },

    /// List the active TLD catalog
    Tlds,
}

/// Everything a command may need, built once from configuration.
struct Broker {
    config: BrokerConfig,
    catalog: Arc<dyn TldCatalog>,
    engine: SuggestionEngine,
    registrations: RegistrationService,
    directory: Arc<InMemoryDirectory>,
    wizard: Wizard,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let json = cli.json;
    if let Err(e) = run(cli).await {
        ui::print_error(&e, json);
        process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), BrokerError> {
    let config = build_config(&cli)?;
    debug!(registrar = ?config.registrar, storage = ?config.storage, "resolved configuration");
    let broker = build_broker(config).await?;

    match cli.command {
        Command::Suggest {
            name,
            country,
            industry,
            limit,
            variants,
        } => {
            let mut request = SuggestionRequest::new(name);
            request.country = country;
            request.industry = industry;
            request.limit = limit;

            let engine = if variants {
                let mut suggestion = broker.config.suggestion.clone();
                suggestion.variants = true;
                broker.engine.clone().with_suggestion_config(suggestion)
            } else {
                broker.engine.clone()
            };

            let spinner = ui::Spinner::start_unless(cli.json, "Checking availability...");
            let response = engine.suggest(request).await;
            spinner.stop().await;
            let response = response?;

            if let Some(e) = &response.availability_error {
                warn!(error = %e, "availability could not be determined");
            }
            ui::print_suggestions(&response, cli.json)
        }

        Command::Check { domains } => {
            let results = broker.engine.check(&domains).await?;
            ui::print_checks(&results, cli.json)
        }

        Command::Register {
            customer,
            domain,
            period,
            token,
        } => {
            let customer = match token {
                Some(token) => broker.wizard.start(&token, customer).await?.customer,
                None => broker
                    .directory
                    .fetch_any(customer)
                    .await?
                    .ok_or(BrokerError::CustomerNotFound {
                        customer_id: customer,
                        partner: None,
                    })?,
            };
            let record = broker
                .registrations
                .submit(&customer, &domain, period)
                .await?;
            ui::print_record(&record, cli.json)
        }

        Command::Cancel { record, reason } => {
            let record = broker.registrations.cancel(record, reason).await?;
            ui::print_record(&record, cli.json)
        }

        Command::Records { customer, pending } => {
            let records = match (customer, pending) {
                (Some(id), false) => broker.registrations.list_for_customer(id).await?,
                (Some(id), true) => broker
                    .registrations
                    .list_pending()
                    .await?
                    .into_iter()
                    .filter(|r| r.customer_id == id)
                    .collect(),
                (None, true) => broker.registrations.list_pending().await?,
                (None, false) => {
                    return Err(BrokerError::config(
                        "records needs --customer <ID> or --pending",
                    ))
                }
            };
            ui::print_records(&records, cli.json)
        }

        Command::WizardStart { token, customer } => {
            let session = broker.wizard.start(&token, customer).await?;
            ui::print_session(&session, cli.json)
        }

        Command::Tlds => {
            let snapshot = broker.catalog.snapshot().await?;
            ui::print_tlds(snapshot.active_tlds(), cli.json)
        }
    }
}

/// Defaults, then config files, then `BROKER_*` variables, then flags.
fn build_config(cli: &Cli) -> Result<BrokerConfig, BrokerError> {
    let env_config = load_env_config();
    let manager = ConfigManager::new(cli.verbose);

    let file_config = match cli.config.as_ref().or(env_config.config.as_ref()) {
        Some(path) => {
            info!(path = %path.display(), "using explicit config file");
            manager.load_file(path)?
        }
        None => manager.discover_and_load()?,
    };

    let mut config = BrokerConfig::default()
        .apply_file(&file_config)?
        .apply_env(&env_config);

    if let Some(mode) = cli.registrar_mode {
        config.registrar.mode = mode;
    }
    if let Some(timeout) = &cli.timeout {
        config.registrar.timeout = parse_timeout_string(timeout).ok_or_else(|| {
            BrokerError::config(format!(
                "Invalid timeout format '{}'. Use format like '500ms', '5s', '2m'",
                timeout
            ))
        })?;
    }

    config.validate()?;
    Ok(config)
}

async fn build_broker(config: BrokerConfig) -> Result<Broker, BrokerError> {
    let inner = match &config.storage.catalog {
        Some(path) => InMemoryCatalog::load_file(path).await?,
        None => default_catalog(),
    };
    let catalog: Arc<dyn TldCatalog> =
        Arc::new(CachedCatalog::new(inner, config.storage.catalog_ttl));

    let gateway = build_gateway(&config.registrar)?;
    info!(registrar = gateway.name(), mode = %config.registrar.mode, "registrar ready");

    let store: Arc<dyn RegistrationStore> = match &config.storage.registrations {
        Some(path) => Arc::new(JsonFileRegistrationStore::open(path).await?),
        None => Arc::new(MemoryRegistrationStore::new()),
    };
    debug!(backend = store.backend_name(), "registration store ready");

    let directory = Arc::new(match &config.storage.directory {
        Some(path) => InMemoryDirectory::load_file(path).await?,
        None => InMemoryDirectory::default(),
    });

    let engine = SuggestionEngine::new(catalog.clone(), gateway.clone())
        .with_suggestion_config(config.suggestion.clone())
        .with_scoring(config.scoring)
        .with_timeout(config.registrar.timeout);

    let registrations = RegistrationService::new(
        catalog.clone(),
        gateway,
        RegistrationRecorder::new(store),
    )
    .with_timeout(config.registrar.timeout)
    .with_registrar_id(config.registrar.registrar_id.clone());

    // Directory tokens first; `[auth] tokens` entries override them.
    let mut tokens = directory.partner_tokens().await;
    tokens.extend(config.tokens.clone());

    let wizard = Wizard::new(
        Arc::new(StaticTokenIdentity::new(tokens)),
        directory.clone(),
        directory.clone(),
    );

    Ok(Broker {
        config,
        catalog,
        engine,
        registrations,
        directory,
        wizard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "domain-broker",
            "suggest",
            "Café Müller",
            "--country",
            "DE",
            "--json",
            "--registrar-mode",
            "fake",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.registrar_mode, Some(RegistrarMode::Fake));
        assert!(matches!(cli.command, Command::Suggest { .. }));
    }

    #[test]
    fn test_invalid_customer_id_is_rejected() {
        let result = Cli::try_parse_from([
            "domain-broker",
            "wizard-start",
            "--token",
            "t",
            "--customer",
            "not-a-uuid",
        ]);
        assert!(result.is_err());
    }
}
