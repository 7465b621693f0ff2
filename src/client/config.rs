use std::path::PathBuf;
use std::time::Duration;

use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError, RetryPolicy};

/// Default Supabase URL for a local `supabase start` stack
const DEFAULT_SUPABASE_URL: &str = "http://127.0.0.1:54321";

/// Client configuration wrapper.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let supabase_url =
            std::env::var("SUPABASE_URL").unwrap_or_else(|_| DEFAULT_SUPABASE_URL.to_string());
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| ConfigError::MissingValue("SUPABASE_ANON_KEY"))?;

        let mut builder = AppConfig::builder()
            .supabase_url(supabase_url)
            .supabase_anon_key(anon_key);

        if let Ok(url) = std::env::var("EMAIL_SERVICE_URL") {
            builder = builder.email_service_url(url);
        }
        if let Ok(url) = std::env::var("SHEETS_SYNC_URL") {
            builder = builder.sheets_sync_url(url);
        }
        if let Ok(url) = std::env::var("PASSWORD_RESET_REDIRECT") {
            builder = builder.password_reset_redirect(url);
        }
        if let Ok(path) = std::env::var("AUTHSYNC_STORAGE_PATH") {
            builder = builder.storage_path(path);
        }
        if let Ok(raw) = std::env::var("AUTHSYNC_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                field: "AUTHSYNC_TIMEOUT_SECS",
                message: e.to_string(),
            })?;
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Ok(raw) = std::env::var("AUTHSYNC_RETRY_ATTEMPTS") {
            let attempts = raw.parse::<u32>().map_err(|e| ConfigError::InvalidValue {
                field: "AUTHSYNC_RETRY_ATTEMPTS",
                message: e.to_string(),
            })?;
            builder = builder.retry(RetryPolicy {
                max_attempts: attempts,
                ..RetryPolicy::default()
            });
        }

        Self::with_builder(builder)
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let app = builder.build()?;
        Ok(Self { app })
    }

    /// Full URL for a GoTrue endpoint, e.g. `/token`
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.app.supabase_url, path)
    }

    /// Full URL for a PostgREST table
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.app.supabase_url, table)
    }

    pub fn anon_key(&self) -> &str {
        &self.app.supabase_anon_key
    }

    pub fn email_service_url(&self) -> Option<&str> {
        self.app.email_service_url.as_deref()
    }

    pub fn sheets_sync_url(&self) -> Option<&str> {
        self.app.sheets_sync_url.as_deref()
    }

    pub fn password_reset_redirect(&self) -> Option<&str> {
        self.app.password_reset_redirect.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.app.request_timeout
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.app.retry
    }

    /// Local storage file, falling back to the platform data directory
    pub fn storage_path(&self) -> PathBuf {
        self.app.storage_path.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
            path.push("authsync");
            path.push("storage.db");
            path
        })
    }
}
