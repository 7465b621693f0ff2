//! Client Session Module
//!
//! Everything needed to run an authentication session against a hosted
//! Supabase project from a client process.
//!
//! # Architecture
//!
//! - **`config`** - Environment-driven configuration
//! - **`auth`** - Session state and the operations that drive it
//! - **`types`** - Profile, row and result types
//! - **`provider`** - Traits at the boundary to external services
//! - **`supabase`** - GoTrue/PostgREST implementation of those traits
//! - **`local_store`** - Persistent key/value storage and the session cache
//! - **`side_effects`** - Background welcome email and sheet sync
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use authsync::client::{AuthSession, Config, SqliteStorage};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let storage = Arc::new(SqliteStorage::open(config.storage_path()).await?);
//! let session = AuthSession::from_config(&config, storage)?;
//!
//! session.initialize().await;
//! let result = session.login("ada@example.com", "hunter2").await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod local_store;
pub mod provider;
pub mod side_effects;
pub mod supabase;
pub mod types;

// Re-export commonly used types
pub use auth::{AuthSession, AuthSessionBuilder, AuthState};
pub use config::Config;
pub use local_store::{LocalStorage, MemoryStorage, SessionCache, SqliteStorage};
pub use provider::{AuthProvider, EmailService, SheetSync, UserStore};
pub use supabase::SupabaseClient;
pub use types::{
    AdminOutcome, AuthResult, AuthUser, ProfileUpdate, RegisterRequest, UserRole, UserRow,
};
