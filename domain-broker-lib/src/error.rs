//! Error handling for suggestion, availability and registration operations.
//!
//! One enum covers the whole taxonomy: user-correctable input errors,
//! infrastructure failures on the read side (catalog), partial failures of
//! the registrar, and bookkeeping conflicts on registration records.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for the broker library.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// The business name could not be turned into a domain label.
    #[error("Invalid business name '{input}': {reason}")]
    InvalidName { input: String, reason: String },

    /// A full domain string was malformed.
    #[error("Invalid domain '{domain}': {reason}")]
    InvalidDomain { domain: String, reason: String },

    /// TLD data could not be read. Fatal to the request.
    #[error("TLD catalog unavailable: {message}")]
    CatalogUnavailable { message: String },

    /// A TLD selected for display has no usable sell price.
    #[error("No sell price can be resolved for TLD '{tld}'")]
    UnresolvablePrice { tld: String },

    /// The TLD is unknown to the catalog or not active.
    #[error("TLD '{tld}' is not offered")]
    UnsupportedTld { tld: String },

    /// The registrar could not be reached or answered with a transport-level failure.
    #[error("Registrar unavailable: {message}")]
    RegistrarUnavailable { message: String },

    /// The registrar did not answer within the configured time.
    #[error("Registrar timed out during {operation}")]
    RegistrarTimeout {
        operation: String,
        timeout: Option<Duration>,
    },

    /// A second registration attempt or a second finalize on the same record.
    #[error("Duplicate submission for '{domain}': {reason}")]
    DuplicateSubmission {
        domain: String,
        record_id: Option<Uuid>,
        reason: String,
    },

    /// No registration record with this identifier exists.
    #[error("Registration record {id} not found")]
    RecordNotFound { id: Uuid },

    /// The caller's token did not resolve to a partner service.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The partner service is unknown or deactivated.
    #[error("Partner service '{key}' not found or inactive")]
    PartnerNotFound { key: String },

    /// The customer is not known (for this partner service, when one is given).
    #[error("Customer {customer_id} not found{}", partner_suffix(.partner))]
    CustomerNotFound {
        customer_id: Uuid,
        partner: Option<String>,
    },

    /// Configuration errors (invalid settings, etc.)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File I/O errors when reading catalog, directory or record files
    #[error("File error at '{path}': {message}")]
    File { path: String, message: String },

    /// JSON / TOML parsing errors
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Generic internal errors that don't fit other categories
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn partner_suffix(partner: &Option<String>) -> String {
    match partner {
        Some(key) => format!(" for partner service '{}'", key),
        None => String::new(),
    }
}

impl BrokerError {
    /// Create a new invalid name error.
    pub fn invalid_name<I: Into<String>, R: Into<String>>(input: I, reason: R) -> Self {
        Self::InvalidName {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new catalog error.
    pub fn catalog<M: Into<String>>(message: M) -> Self {
        Self::CatalogUnavailable {
            message: message.into(),
        }
    }

    /// Create a new registrar transport error.
    pub fn registrar<M: Into<String>>(message: M) -> Self {
        Self::RegistrarUnavailable {
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, timeout: Duration) -> Self {
        Self::RegistrarTimeout {
            operation: operation.into(),
            timeout: Some(timeout),
        }
    }

    /// Create a new duplicate submission error.
    pub fn duplicate<D: Into<String>, R: Into<String>>(
        domain: D,
        record_id: Option<Uuid>,
        reason: R,
    ) -> Self {
        Self::DuplicateSubmission {
            domain: domain.into(),
            record_id,
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error suggests the operation may succeed when repeated.
    ///
    /// Only read-side operations should act on this; registration
    /// submissions are never repeated without an explicit caller decision.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RegistrarUnavailable { .. }
                | Self::RegistrarTimeout { .. }
                | Self::CatalogUnavailable { .. }
        )
    }

    /// Check if this is an input error the end user can correct.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidName { .. } | Self::InvalidDomain { .. } | Self::UnsupportedTld { .. }
        )
    }

    /// Stable machine-readable identifier for structured error output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidName { .. } => "invalid_name",
            Self::InvalidDomain { .. } => "invalid_domain",
            Self::CatalogUnavailable { .. } => "catalog_unavailable",
            Self::UnresolvablePrice { .. } => "unresolvable_price",
            Self::UnsupportedTld { .. } => "unsupported_tld",
            Self::RegistrarUnavailable { .. } => "registrar_unavailable",
            Self::RegistrarTimeout { .. } => "registrar_timeout",
            Self::DuplicateSubmission { .. } => "duplicate_submission",
            Self::RecordNotFound { .. } => "record_not_found",
            Self::Unauthorized { .. } => "unauthorized",
            Self::PartnerNotFound { .. } => "partner_not_found",
            Self::CustomerNotFound { .. } => "customer_not_found",
            Self::Config { .. } => "config",
            Self::File { .. } => "file",
            Self::Parse { .. } => "parse",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Errors serialize as `{ "kind": ..., "message": ... }` for JSON output.
impl serde::Serialize for BrokerError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("BrokerError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl From<reqwest::Error> for BrokerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::RegistrarTimeout {
                operation: "HTTP request".to_string(),
                timeout: None,
            }
        } else if err.is_connect() {
            Self::registrar(format!("connection failed: {}", err))
        } else if err.is_decode() {
            Self::Parse {
                message: format!("registrar response could not be decoded: {}", err),
            }
        } else {
            Self::registrar(format!("HTTP request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: format!("JSON parsing failed: {}", err),
        }
    }
}

impl From<toml::de::Error> for BrokerError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse {
            message: format!("TOML parsing failed: {}", err),
        }
    }
}

impl From<std::io::Error> for BrokerError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(BrokerError::registrar("down").is_retryable());
        assert!(BrokerError::timeout("domain.check", Duration::from_secs(2)).is_retryable());
        assert!(BrokerError::catalog("db gone").is_retryable());
        assert!(!BrokerError::invalid_name("", "empty").is_retryable());
        assert!(!BrokerError::duplicate("a.de", None, "pending").is_retryable());
    }

    #[test]
    fn test_user_error_classification() {
        assert!(BrokerError::invalid_name("!!!", "no usable characters").is_user_error());
        assert!(BrokerError::invalid_domain("x", "no TLD").is_user_error());
        assert!(!BrokerError::registrar("down").is_user_error());
    }

    #[test]
    fn test_display_messages() {
        let err = BrokerError::CustomerNotFound {
            customer_id: Uuid::nil(),
            partner: Some("handwerker24".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Customer 00000000-0000-0000-0000-000000000000 not found for partner service 'handwerker24'"
        );

        let err = BrokerError::CustomerNotFound {
            customer_id: Uuid::nil(),
            partner: None,
        };
        assert!(err.to_string().ends_with("not found"));

        let err = BrokerError::timeout("domain.create", Duration::from_secs(5));
        assert_eq!(err.to_string(), "Registrar timed out during domain.create");
        assert_eq!(err.kind(), "registrar_timeout");
    }
}
