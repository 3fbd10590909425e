//! Configuration file parsing and management.
//!
//! Runtime settings are layered in increasing precedence: built-in defaults,
//! TOML files (XDG, home, local, or one explicit path), `BROKER_*`
//! environment variables and finally command-line flags applied by the caller.

use crate::error::BrokerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hard upper bound for the number of suggestions per request.
pub const MAX_SUGGESTION_CEILING: usize = 200;

/// Configuration loaded from TOML files.
///
/// Every field is optional so files can be merged section by section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<SuggestionSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoringSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<RegistrarSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageSection>,
}

/// `[suggestion]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SuggestionSection {
    /// Limit used when a request does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<usize>,

    /// Largest limit a request may ask for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<usize>,

    /// Generate name variants in addition to the bare label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variants: Option<bool>,

    /// Maximum number of variants per label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_variants: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefixes: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffixes: Option<Vec<String>>,

    /// Industry tag -> keywords combined with the label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry_keywords: Option<BTreeMap<String, Vec<String>>>,
}

/// `[scoring]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoringSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_weight: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_bonus: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry_bonus: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_penalty: Option<i64>,

    /// Minimum TLD priority for a bare label to be flagged as recommended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommend_min_priority: Option<i32>,
}

/// `[registrar]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistrarSection {
    /// "fake", "ote" or "production"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Endpoint override for the JSON-RPC registrar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Contact handle used as owner/admin/tech/billing contact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_handle: Option<String>,

    /// Timeout as string, e.g. "5s", "500ms", "1m"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Domains per `domain.check` call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Registrar id used to look up purchase costs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar_id: Option<String>,

    /// Domains the fake registrar reports as taken
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken: Option<Vec<String>>,

    /// Artificial response delay of the fake registrar, e.g. "2s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fake_delay: Option<String>,
}

/// `[auth]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthSection {
    /// Static token -> partner service key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<BTreeMap<String, String>>,
}

/// `[storage]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageSection {
    /// TOML catalog with `[[tld]]` and `[[pricing]]` tables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,

    /// TOML file with `[[partner]]` and `[[customer]]` tables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// JSON file holding registration records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrations: Option<PathBuf>,

    /// Catalog snapshot cache lifetime, e.g. "60s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_ttl: Option<String>,
}

/// Which registrar backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegistrarMode {
    /// In-process stand-in, no network
    #[default]
    Fake,
    /// Registrar test environment
    Ote,
    /// Live registrar
    Production,
}

impl RegistrarMode {
    /// Well-known JSON-RPC endpoint for this mode, if it has one.
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            RegistrarMode::Fake => None,
            RegistrarMode::Ote => Some("https://api.ote.inwx.com/jsonrpc/"),
            RegistrarMode::Production => Some("https://api.inwx.com/jsonrpc/"),
        }
    }
}

impl FromStr for RegistrarMode {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fake" => Ok(RegistrarMode::Fake),
            "ote" | "test" => Ok(RegistrarMode::Ote),
            "production" | "prod" | "live" => Ok(RegistrarMode::Production),
            other => Err(BrokerError::config(format!(
                "Unknown registrar mode '{}'. Use 'fake', 'ote' or 'production'",
                other
            ))),
        }
    }
}

impl fmt::Display for RegistrarMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrarMode::Fake => write!(f, "fake"),
            RegistrarMode::Ote => write!(f, "ote"),
            RegistrarMode::Production => write!(f, "production"),
        }
    }
}

/// Candidate generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub variants: bool,
    pub max_variants: usize,
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
    pub industry_keywords: BTreeMap<String, Vec<String>>,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        let mut industry_keywords = BTreeMap::new();
        industry_keywords.insert(
            "handwerker".to_string(),
            vec!["handwerk".into(), "meister".into(), "service".into()],
        );
        industry_keywords.insert(
            "haendler".to_string(),
            vec!["shop".into(), "store".into(), "markt".into()],
        );
        industry_keywords.insert(
            "dienstleister".to_string(),
            vec!["service".into(), "pro".into(), "experte".into()],
        );

        Self {
            default_limit: 10,
            max_limit: 50,
            variants: false,
            max_variants: 6,
            prefixes: vec!["mein".to_string()],
            suffixes: vec!["online".to_string(), "24".to_string()],
            industry_keywords,
        }
    }
}

impl SuggestionConfig {
    /// Clamp a requested limit into `1..=max_limit`, falling back to the default.
    ///
    /// A request is never refused for its limit: `0` yields one suggestion
    /// and anything above `max_limit` yields `max_limit`.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

/// Weights of the composite rank score.
///
/// `score = priority * priority_weight + country bonus + industry bonus - variant penalty`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringConfig {
    pub priority_weight: i64,
    pub country_bonus: i64,
    pub industry_bonus: i64,
    pub variant_penalty: i64,
    pub recommend_min_priority: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            priority_weight: 10,
            country_bonus: 100,
            industry_bonus: 50,
            variant_penalty: 25,
            recommend_min_priority: 90,
        }
    }
}

/// Registrar connection settings.
#[derive(Clone, PartialEq)]
pub struct RegistrarConfig {
    pub mode: RegistrarMode,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub contact_handle: Option<String>,
    pub timeout: Duration,
    pub batch_size: usize,
    pub registrar_id: String,
    pub taken: Vec<String>,
    pub fake_delay: Option<Duration>,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            mode: RegistrarMode::Fake,
            url: None,
            username: None,
            password: None,
            contact_handle: None,
            timeout: Duration::from_secs(5),
            batch_size: 20,
            registrar_id: "inwx".to_string(),
            taken: Vec::new(),
            fake_delay: None,
        }
    }
}

impl RegistrarConfig {
    /// Endpoint to use: explicit override, else the mode's well-known URL.
    pub fn endpoint(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| self.mode.default_endpoint().map(str::to_string))
    }
}

// Hand-written so the password never ends up in debug logs.
impl fmt::Debug for RegistrarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrarConfig")
            .field("mode", &self.mode)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("contact_handle", &self.contact_handle)
            .field("timeout", &self.timeout)
            .field("batch_size", &self.batch_size)
            .field("registrar_id", &self.registrar_id)
            .field("taken", &self.taken)
            .field("fake_delay", &self.fake_delay)
            .finish()
    }
}

/// Storage locations; `None` means in-memory / built-in.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub catalog: Option<PathBuf>,
    pub directory: Option<PathBuf>,
    pub registrations: Option<PathBuf>,
    pub catalog_ttl: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            directory: None,
            registrations: None,
            catalog_ttl: Duration::from_secs(60),
        }
    }
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct BrokerConfig {
    pub suggestion: SuggestionConfig,
    pub scoring: ScoringConfig,
    pub registrar: RegistrarConfig,
    /// Static token -> partner service key
    pub tokens: BTreeMap<String, String>,
    pub storage: StorageConfig,
}

impl BrokerConfig {
    /// Overlay values from a (merged) file configuration.
    pub fn apply_file(mut self, file: &FileConfig) -> Result<Self, BrokerError> {
        if let Some(s) = &file.suggestion {
            if let Some(v) = s.default_limit {
                self.suggestion.default_limit = v;
            }
            if let Some(v) = s.max_limit {
                self.suggestion.max_limit = v;
            }
            if let Some(v) = s.variants {
                self.suggestion.variants = v;
            }
            if let Some(v) = s.max_variants {
                self.suggestion.max_variants = v;
            }
            if let Some(v) = &s.prefixes {
                self.suggestion.prefixes = v.clone();
            }
            if let Some(v) = &s.suffixes {
                self.suggestion.suffixes = v.clone();
            }
            if let Some(v) = &s.industry_keywords {
                self.suggestion.industry_keywords = v
                    .iter()
                    .map(|(k, words)| (k.to_ascii_lowercase(), words.clone()))
                    .collect();
            }
        }

        if let Some(s) = &file.scoring {
            if let Some(v) = s.priority_weight {
                self.scoring.priority_weight = v;
            }
            if let Some(v) = s.country_bonus {
                self.scoring.country_bonus = v;
            }
            if let Some(v) = s.industry_bonus {
                self.scoring.industry_bonus = v;
            }
            if let Some(v) = s.variant_penalty {
                self.scoring.variant_penalty = v;
            }
            if let Some(v) = s.recommend_min_priority {
                self.scoring.recommend_min_priority = v;
            }
        }

        if let Some(r) = &file.registrar {
            if let Some(mode) = &r.mode {
                self.registrar.mode = mode.parse()?;
            }
            if r.url.is_some() {
                self.registrar.url = r.url.clone();
            }
            if r.username.is_some() {
                self.registrar.username = r.username.clone();
            }
            if r.password.is_some() {
                self.registrar.password = r.password.clone();
            }
            if r.contact_handle.is_some() {
                self.registrar.contact_handle = r.contact_handle.clone();
            }
            if let Some(t) = &r.timeout {
                self.registrar.timeout = require_timeout(t)?;
            }
            if let Some(v) = r.batch_size {
                self.registrar.batch_size = v;
            }
            if let Some(v) = &r.registrar_id {
                self.registrar.registrar_id = v.clone();
            }
            if let Some(v) = &r.taken {
                self.registrar.taken = v.clone();
            }
            if let Some(t) = &r.fake_delay {
                self.registrar.fake_delay = Some(require_timeout(t)?);
            }
        }

        if let Some(tokens) = file.auth.as_ref().and_then(|a| a.tokens.as_ref()) {
            self.tokens = tokens.clone();
        }

        if let Some(s) = &file.storage {
            if s.catalog.is_some() {
                self.storage.catalog = s.catalog.clone();
            }
            if s.directory.is_some() {
                self.storage.directory = s.directory.clone();
            }
            if s.registrations.is_some() {
                self.storage.registrations = s.registrations.clone();
            }
            if let Some(t) = &s.catalog_ttl {
                self.storage.catalog_ttl = require_timeout(t)?;
            }
        }

        Ok(self)
    }

    /// Overlay values from `BROKER_*` environment variables.
    pub fn apply_env(mut self, env_config: &EnvConfig) -> Self {
        if let Some(mode) = env_config.registrar_mode {
            self.registrar.mode = mode;
        }
        if env_config.registrar_url.is_some() {
            self.registrar.url = env_config.registrar_url.clone();
        }
        if env_config.registrar_user.is_some() {
            self.registrar.username = env_config.registrar_user.clone();
        }
        if env_config.registrar_password.is_some() {
            self.registrar.password = env_config.registrar_password.clone();
        }
        if let Some(timeout) = env_config.timeout {
            self.registrar.timeout = timeout;
        }
        if let Some(limit) = env_config.suggestion_limit {
            self.suggestion.default_limit = limit;
        }
        if let Some(variants) = env_config.variants {
            self.suggestion.variants = variants;
        }
        if env_config.catalog.is_some() {
            self.storage.catalog = env_config.catalog.clone();
        }
        if env_config.directory.is_some() {
            self.storage.directory = env_config.directory.clone();
        }
        if env_config.registrations.is_some() {
            self.storage.registrations = env_config.registrations.clone();
        }
        self
    }

    /// Check the resolved settings for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), BrokerError> {
        let s = &self.suggestion;
        if s.max_limit == 0 || s.max_limit > MAX_SUGGESTION_CEILING {
            return Err(BrokerError::config(format!(
                "suggestion.max_limit must be between 1 and {}",
                MAX_SUGGESTION_CEILING
            )));
        }
        if s.default_limit == 0 || s.default_limit > s.max_limit {
            return Err(BrokerError::config(format!(
                "suggestion.default_limit must be between 1 and max_limit ({})",
                s.max_limit
            )));
        }

        let w = &self.scoring;
        for (name, value) in [
            ("priority_weight", w.priority_weight),
            ("country_bonus", w.country_bonus),
            ("industry_bonus", w.industry_bonus),
        ] {
            if value < 0 {
                return Err(BrokerError::config(format!(
                    "scoring.{} must not be negative",
                    name
                )));
            }
        }
        // A zero penalty would let a variant tie its own bare label.
        if w.variant_penalty < 1 {
            return Err(BrokerError::config(
                "scoring.variant_penalty must be at least 1",
            ));
        }

        let r = &self.registrar;
        if r.timeout.is_zero() {
            return Err(BrokerError::config("registrar.timeout must be positive"));
        }
        if r.batch_size == 0 || r.batch_size > 500 {
            return Err(BrokerError::config(
                "registrar.batch_size must be between 1 and 500",
            ));
        }
        if r.mode != RegistrarMode::Fake && (r.username.is_none() || r.password.is_none()) {
            return Err(BrokerError::config(format!(
                "registrar mode '{}' needs username and password",
                r.mode
            )));
        }
        if r.mode != RegistrarMode::Fake && r.contact_handle.is_none() {
            return Err(BrokerError::config(format!(
                "registrar mode '{}' needs a contact_handle",
                r.mode
            )));
        }

        for (token, partner) in &self.tokens {
            if token.trim().is_empty() || partner.trim().is_empty() {
                return Err(BrokerError::config(
                    "auth.tokens entries must have a non-empty token and partner key",
                ));
            }
        }

        Ok(())
    }
}

fn require_timeout(value: &str) -> Result<Duration, BrokerError> {
    parse_timeout_string(value).ok_or_else(|| {
        BrokerError::config(format!(
            "Invalid timeout format '{}'. Use format like '500ms', '5s', '2m'",
            value
        ))
    })
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Log which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, BrokerError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BrokerError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            BrokerError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            BrokerError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;
        debug!(path = %path.display(), "loaded configuration file");

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config first, then the home directory, then the working
    /// directory; later files override earlier ones field by field.
    pub fn discover_and_load(&self) -> Result<FileConfig, BrokerError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping configuration file"),
            }
        }

        if self.verbose && !loaded_files.is_empty() {
            for path in &loaded_files {
                info!(path = %path.display(), "using configuration file");
            }
        }

        Ok(merged_config)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-broker.toml", "./.domain-broker.toml"]
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-broker.toml", "domain-broker.toml"]
            .iter()
            .map(|c| Path::new(&home).join(c))
            .find(|p| p.exists())
    }

    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-broker").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` win.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            suggestion: merge_section(lower.suggestion, higher.suggestion, |mut l, h| {
                l.default_limit = h.default_limit.or(l.default_limit);
                l.max_limit = h.max_limit.or(l.max_limit);
                l.variants = h.variants.or(l.variants);
                l.max_variants = h.max_variants.or(l.max_variants);
                l.prefixes = h.prefixes.or(l.prefixes);
                l.suffixes = h.suffixes.or(l.suffixes);
                l.industry_keywords = match (l.industry_keywords, h.industry_keywords) {
                    (Some(mut lk), Some(hk)) => {
                        lk.extend(hk);
                        Some(lk)
                    }
                    (lk, hk) => hk.or(lk),
                };
                l
            }),
            scoring: merge_section(lower.scoring, higher.scoring, |mut l, h| {
                l.priority_weight = h.priority_weight.or(l.priority_weight);
                l.country_bonus = h.country_bonus.or(l.country_bonus);
                l.industry_bonus = h.industry_bonus.or(l.industry_bonus);
                l.variant_penalty = h.variant_penalty.or(l.variant_penalty);
                l.recommend_min_priority = h.recommend_min_priority.or(l.recommend_min_priority);
                l
            }),
            registrar: merge_section(lower.registrar, higher.registrar, |mut l, h| {
                l.mode = h.mode.or(l.mode);
                l.url = h.url.or(l.url);
                l.username = h.username.or(l.username);
                l.password = h.password.or(l.password);
                l.contact_handle = h.contact_handle.or(l.contact_handle);
                l.timeout = h.timeout.or(l.timeout);
                l.batch_size = h.batch_size.or(l.batch_size);
                l.registrar_id = h.registrar_id.or(l.registrar_id);
                l.taken = h.taken.or(l.taken);
                l.fake_delay = h.fake_delay.or(l.fake_delay);
                l
            }),
            auth: merge_section(lower.auth, higher.auth, |l, h| AuthSection {
                tokens: match (l.tokens, h.tokens) {
                    (Some(mut lt), Some(ht)) => {
                        lt.extend(ht);
                        Some(lt)
                    }
                    (lt, ht) => ht.or(lt),
                },
            }),
            storage: merge_section(lower.storage, higher.storage, |mut l, h| {
                l.catalog = h.catalog.or(l.catalog);
                l.directory = h.directory.or(l.directory);
                l.registrations = h.registrations.or(l.registrations);
                l.catalog_ttl = h.catalog_ttl.or(l.catalog_ttl);
                l
            }),
        }
    }

    /// Validate a single file for values that are wrong regardless of layering.
    fn validate_config(&self, config: &FileConfig) -> Result<(), BrokerError> {
        if let Some(registrar) = &config.registrar {
            if let Some(mode) = &registrar.mode {
                mode.parse::<RegistrarMode>()?;
            }
            if let Some(timeout) = &registrar.timeout {
                require_timeout(timeout)?;
            }
            if registrar.batch_size == Some(0) {
                return Err(BrokerError::config("registrar.batch_size must be positive"));
            }
        }

        if let Some(suggestion) = &config.suggestion {
            if suggestion.default_limit == Some(0) || suggestion.max_limit == Some(0) {
                return Err(BrokerError::config("suggestion limits must be positive"));
            }
        }

        if let Some(scoring) = &config.scoring {
            let negative = [
                scoring.priority_weight,
                scoring.country_bonus,
                scoring.industry_bonus,
                scoring.variant_penalty,
            ]
            .into_iter()
            .flatten()
            .any(|v| v < 0);
            if negative {
                return Err(BrokerError::config("scoring weights must not be negative"));
            }
        }

        if let Some(tokens) = config.auth.as_ref().and_then(|a| a.tokens.as_ref()) {
            if tokens.keys().any(|k| k.trim().is_empty()) {
                return Err(BrokerError::config("auth.tokens keys cannot be empty"));
            }
        }

        if let Some(ttl) = config.storage.as_ref().and_then(|s| s.catalog_ttl.as_ref()) {
            require_timeout(ttl)?;
        }

        Ok(())
    }
}

fn merge_section<T>(lower: Option<T>, higher: Option<T>, merge: impl FnOnce(T, T) -> T) -> Option<T> {
    match (lower, higher) {
        (Some(l), Some(h)) => Some(merge(l, h)),
        (l, h) => h.or(l),
    }
}

/// Settings read from `BROKER_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub registrar_mode: Option<RegistrarMode>,
    pub registrar_url: Option<String>,
    pub registrar_user: Option<String>,
    pub registrar_password: Option<String>,
    pub timeout: Option<Duration>,
    pub suggestion_limit: Option<usize>,
    pub variants: Option<bool>,
    pub catalog: Option<PathBuf>,
    pub directory: Option<PathBuf>,
    pub registrations: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Load configuration from the process environment.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|key| env::var(key).ok())
}

/// Build an [`EnvConfig`] from any variable lookup.
pub fn env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(val) = non_empty("BROKER_REGISTRAR_MODE") {
        match val.parse::<RegistrarMode>() {
            Ok(mode) => {
                debug!("Using BROKER_REGISTRAR_MODE={}", mode);
                env_config.registrar_mode = Some(mode);
            }
            Err(_) => warn!(
                "Invalid BROKER_REGISTRAR_MODE='{}', use fake/ote/production",
                val
            ),
        }
    }

    env_config.registrar_url = non_empty("BROKER_REGISTRAR_URL");
    env_config.registrar_user = non_empty("BROKER_REGISTRAR_USER");
    env_config.registrar_password = non_empty("BROKER_REGISTRAR_PASSWORD");

    if let Some(val) = non_empty("BROKER_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(t) if !t.is_zero() => env_config.timeout = Some(t),
            _ => warn!(
                "Invalid BROKER_TIMEOUT='{}', use format like '500ms', '5s', '2m'",
                val
            ),
        }
    }

    if let Some(val) = non_empty("BROKER_SUGGESTION_LIMIT") {
        match val.trim().parse::<usize>() {
            Ok(limit) if limit > 0 && limit <= MAX_SUGGESTION_CEILING => {
                env_config.suggestion_limit = Some(limit)
            }
            _ => warn!(
                "Invalid BROKER_SUGGESTION_LIMIT='{}', must be 1-{}",
                val, MAX_SUGGESTION_CEILING
            ),
        }
    }

    if let Some(val) = non_empty("BROKER_VARIANTS") {
        match parse_bool_flag(&val) {
            Some(b) => env_config.variants = Some(b),
            None => warn!("Invalid BROKER_VARIANTS='{}', use true/false", val),
        }
    }

    env_config.catalog = non_empty("BROKER_CATALOG").map(PathBuf::from);
    env_config.directory = non_empty("BROKER_DIRECTORY").map(PathBuf::from);
    env_config.registrations = non_empty("BROKER_REGISTRATIONS").map(PathBuf::from);
    env_config.config = non_empty("BROKER_CONFIG").map(PathBuf::from);

    env_config
}

fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a timeout string like "500ms", "5s", "2m" into a duration.
///
/// A bare number means seconds.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(ms) = timeout_str.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(s) = timeout_str.strip_suffix('s') {
        s.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(m) = timeout_str.strip_suffix('m') {
        m.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        timeout_str.parse::<u64>().ok().map(Duration::from_secs)
    }
}
