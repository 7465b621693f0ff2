//! Session Types
//!
//! The normalized user profile kept in session state, the backend row it is
//! built from, and the request/result shapes of the session operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::ServiceError;

/// Role stored on the profile row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Provider,
    Admin,
}

/// Normalized profile held in session state and in local storage.
///
/// Serializes with camelCase keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub provider_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    pub is_active: bool,
}

impl AuthUser {
    /// Merge a successful patch into the local copy
    pub fn apply(&mut self, update: &ProfileUpdate, last_login: DateTime<Utc>) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(phone) = &update.phone {
            self.phone = phone.clone();
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(provider_id) = &update.provider_id {
            self.provider_id = provider_id.clone();
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.last_login = last_login;
    }

    /// Backend row form, as sent to the sheet sync
    pub fn to_row(&self) -> UserRow {
        UserRow {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            phone: self.phone.clone(),
            role: self.role,
            provider_id: self.provider_id.clone(),
            created_at: self.created_at.to_rfc3339(),
            last_login: Some(self.last_login.to_rfc3339()),
            is_active: self.is_active,
        }
    }
}

/// Row of the backend `users` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub provider_id: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub last_login: Option<String>,
    pub is_active: bool,
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, ServiceError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ServiceError::mapping(field, format!("{raw:?}: {e}")))
}

impl TryFrom<UserRow> for AuthUser {
    type Error = ServiceError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let created_at = parse_timestamp("created_at", &row.created_at)?;
        // rows written outside registration may never have logged in
        let last_login = match row.last_login.as_deref() {
            Some(raw) => parse_timestamp("last_login", raw)?,
            None => created_at,
        };

        Ok(Self {
            id: row.id,
            email: row.email,
            name: row.name,
            phone: row.phone,
            role: row.role,
            provider_id: row.provider_id,
            created_at,
            last_login,
            is_active: row.is_active,
        })
    }
}

/// Fields a caller may patch on the profile row.
///
/// `None` leaves a column alone. The nullable columns take `Some(None)` to
/// write `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ProfileUpdate {
    /// Patch that only links an external provider identity
    pub fn link_provider(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: Some(Some(provider_id.into())),
            ..Self::default()
        }
    }
}

/// Body of a row update: the caller's fields plus the login timestamp
#[derive(Debug, Clone, Serialize)]
pub struct UserPatch {
    #[serde(flatten)]
    pub fields: ProfileUpdate,
    pub last_login: String,
}

/// Registration input
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

impl RegisterRequest {
    /// Profile row inserted right after sign-up
    pub fn to_row(&self, id: impl Into<String>, now: DateTime<Utc>) -> UserRow {
        UserRow {
            id: id.into(),
            email: self.email.clone(),
            name: self.name.clone(),
            phone: self.phone.clone(),
            role: self.role,
            provider_id: None,
            created_at: now.to_rfc3339(),
            last_login: Some(now.to_rfc3339()),
            is_active: true,
        }
    }
}

/// Identity known to the auth provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Token set returned by a password grant or an auto-confirmed sign-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: ProviderUser,
}

/// Outcome of a provider sign-up
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: ProviderUser,
    /// Absent when the provider requires email confirmation first
    pub session: Option<ProviderSession>,
}

/// Flattened result handed back by login, register and password reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

/// Result of an admin operation that has no backing implementation yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    NotImplemented,
}
