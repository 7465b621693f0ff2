//! Collaborator seams
//!
//! The session only talks to the outside world through these traits, so the
//! hosted backend can be swapped for fakes in tests.

use async_trait::async_trait;

use crate::client::types::{ProviderSession, ProviderUser, SignUpOutcome, UserPatch, UserRow};
use crate::shared::error::ServiceError;

/// Hosted identity provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Password grant
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ServiceError>;

    /// Create an identity; `name`/`phone` go into the provider's user metadata
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        phone: Option<&str>,
    ) -> Result<SignUpOutcome, ServiceError>;

    async fn sign_out(&self) -> Result<(), ServiceError>;

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), ServiceError>;

    /// User of the current provider session, if any
    async fn current_user(&self) -> Result<Option<ProviderUser>, ServiceError>;
}

/// Row store holding the `users` table
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn select_user(&self, id: &str) -> Result<UserRow, ServiceError>;

    async fn insert_user(&self, row: &UserRow) -> Result<(), ServiceError>;

    async fn update_user(&self, id: &str, patch: &UserPatch) -> Result<(), ServiceError>;
}

/// Transactional email sender
#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send_welcome_email(&self, email: &str, name: &str) -> Result<(), ServiceError>;
}

/// Spreadsheet mirror of the users table
#[async_trait]
pub trait SheetSync: Send + Sync {
    async fn sync_user(&self, row: &UserRow) -> Result<(), ServiceError>;
}
