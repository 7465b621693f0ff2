//! Shared Module
//!
//! Configuration and error types used across the client modules and the
//! probe binary.

/// Service error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError, RetryPolicy};
pub use error::ServiceError;
