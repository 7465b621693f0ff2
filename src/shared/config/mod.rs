//! Application configuration module
//!
//! Provides the validated configuration the session client is built from.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default request timeout for backend calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Retry policy applied to background side effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Supabase project URL, without trailing slash
    pub supabase_url: String,
    /// Public anon key sent as `apikey`
    pub supabase_anon_key: String,
    /// Welcome email endpoint
    pub email_service_url: Option<String>,
    /// Spreadsheet sync endpoint
    pub sheets_sync_url: Option<String>,
    /// Where password reset links should land
    pub password_reset_redirect: Option<String>,
    /// Local storage database file
    pub storage_path: Option<PathBuf>,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Side-effect retry policy
    pub retry: RetryPolicy,
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url(&self.supabase_url)?;
        if self.supabase_anon_key.trim().is_empty() {
            return Err(ConfigError::MissingValue("supabase_anon_key"));
        }
        for url in [&self.email_service_url, &self.sheets_sync_url]
            .into_iter()
            .flatten()
        {
            validate_url(url)?;
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn validate_url(url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl(url.to_string()))
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    email_service_url: Option<String>,
    sheets_sync_url: Option<String>,
    password_reset_redirect: Option<String>,
    storage_path: Option<PathBuf>,
    request_timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
}

impl AppConfigBuilder {
    /// Set the Supabase project URL
    pub fn supabase_url(mut self, url: impl Into<String>) -> Self {
        self.supabase_url = Some(url.into());
        self
    }

    /// Set the anon key
    pub fn supabase_anon_key(mut self, key: impl Into<String>) -> Self {
        self.supabase_anon_key = Some(key.into());
        self
    }

    /// Set the welcome email endpoint
    pub fn email_service_url(mut self, url: impl Into<String>) -> Self {
        self.email_service_url = Some(url.into());
        self
    }

    /// Set the spreadsheet sync endpoint
    pub fn sheets_sync_url(mut self, url: impl Into<String>) -> Self {
        self.sheets_sync_url = Some(url.into());
        self
    }

    /// Set the password reset redirect
    pub fn password_reset_redirect(mut self, url: impl Into<String>) -> Self {
        self.password_reset_redirect = Some(url.into());
        self
    }

    /// Set the local storage file
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Set the HTTP request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the side-effect retry policy
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let config = AppConfig {
            supabase_url: self
                .supabase_url
                .ok_or(ConfigError::MissingValue("supabase_url"))?
                .trim_end_matches('/')
                .to_string(),
            supabase_anon_key: self
                .supabase_anon_key
                .ok_or(ConfigError::MissingValue("supabase_anon_key"))?,
            email_service_url: self.email_service_url,
            sheets_sync_url: self.sheets_sync_url,
            password_reset_redirect: self.password_reset_redirect,
            storage_path: self.storage_path,
            request_timeout: self
                .request_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            retry: self.retry.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}
