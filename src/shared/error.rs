//! Service Error Types
//!
//! Errors raised by the collaborators the session talks to: the auth
//! provider, the row store, local storage and the side-effect services.
//!
//! # Error Categories
//!
//! - `Provider` - the remote service answered with a non-success status
//! - `Network` - the request never produced a response
//! - `Serialization` - JSON encoding/decoding failures
//! - `Storage` - local key-value storage failures
//! - `NotFound` - a single-row select matched nothing
//! - `Mapping` - a backend row could not be turned into an `AuthUser`
//! - `Disabled` - the service has no endpoint configured
//!
//! # Usage
//!
//! ```rust
//! use authsync::shared::error::ServiceError;
//!
//! let error = ServiceError::provider(400, "Invalid login credentials");
//! assert_eq!(error.user_message(), "Invalid login credentials");
//! ```
use thiserror::Error;

/// Errors returned by the session's external collaborators
#[derive(Debug, Error, Clone)]
pub enum ServiceError {
    /// Remote service returned a non-success status
    #[error("Provider error ({status}): {message}")]
    Provider {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// Transport failure (connect, timeout, TLS)
    #[error("Network error: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },

    /// Local storage error
    #[error("Storage error: {message}")]
    Storage {
        /// Human-readable error message
        message: String,
    },

    /// No row matched
    #[error("Not found: {what}")]
    NotFound {
        /// What was looked up
        what: String,
    },

    /// Backend row could not be mapped into the client shape
    #[error("Mapping error in field '{field}': {message}")]
    Mapping {
        /// Offending field
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Service has no endpoint configured
    #[error("Service disabled: {service}")]
    Disabled {
        /// Service name
        service: &'static str,
    },
}

impl ServiceError {
    /// Create a new provider error
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a new mapping error
    pub fn mapping(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mapping {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The plain message handed back to callers in an `AuthResult`.
    ///
    /// Provider errors surface the provider's own text; everything else
    /// uses the display form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::serialization(err.to_string());
        }
        match err.status() {
            Some(status) => Self::provider(status.as_u16(), err.to_string()),
            None => Self::network(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(err.to_string())
    }
}
