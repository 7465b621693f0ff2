//! authsync - Client Authentication Session
//!
//! Keeps a client's authentication state in step with a hosted Supabase
//! project: password sign-in, sign-up with a profile row, sign-out, profile
//! updates, provider linking and password reset. The signed-in profile is
//! mirrored into persistent local storage, and registration/profile changes
//! fan out to a welcome email and a spreadsheet sync in the background.
//!
//! # Module Structure
//!
//! - **`shared`** - Configuration and error types
//!   - `AppConfig` builder and validation
//!   - `ServiceError` for collaborator failures
//!
//! - **`client`** - The session and its collaborators
//!   - `AuthSession` state machine (loading / authenticated / anonymous)
//!   - Supabase GoTrue + PostgREST client
//!   - SQLite-backed local storage
//!   - Background side effects with retry
//!
//! # Error Handling
//!
//! Collaborators return `Result<T, ServiceError>`. The session flattens
//! errors at its surface: login, register and password reset return an
//! `AuthResult` carrying the provider's message, while profile fetches and
//! updates log and absorb failures.

/// Shared configuration and error types
pub mod shared;

/// Client session and collaborators
pub mod client;
