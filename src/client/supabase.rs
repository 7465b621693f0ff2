//! Supabase REST client
//!
//! Speaks GoTrue (`/auth/v1`) for identity and PostgREST (`/rest/v1`) for the
//! `users` table. The provider session is kept in memory and, when local
//! storage is attached, persisted under [`AUTH_SESSION_KEY`] so a later
//! process can pick it up.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::client::config::Config;
use crate::client::local_store::{LocalStorage, AUTH_SESSION_KEY};
use crate::client::provider::{AuthProvider, UserStore};
use crate::client::types::{ProviderSession, ProviderUser, SignUpOutcome, UserPatch, UserRow};
use crate::shared::error::ServiceError;

const USERS_TABLE: &str = "users";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Build a `ServiceError` from a non-success response.
///
/// GoTrue and PostgREST disagree on the error field name, so the first of
/// `error_description`, `msg`, `message`, `error` wins.
pub(crate) async fn error_from_response(response: Response) -> ServiceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    ServiceError::provider(status.as_u16(), message)
}

/// Client for a Supabase project
pub struct SupabaseClient {
    http: Client,
    config: Config,
    session: RwLock<Option<ProviderSession>>,
    storage: Option<Arc<dyn LocalStorage>>,
}

impl SupabaseClient {
    pub fn new(config: Config) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_http(http, config))
    }

    pub fn with_http(http: Client, config: Config) -> Self {
        Self {
            http,
            config,
            session: RwLock::new(None),
            storage: None,
        }
    }

    /// Persist the provider session in `storage`
    pub fn with_storage(mut self, storage: Arc<dyn LocalStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Shared HTTP client, reused by the side-effect services
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Current provider session, loading it from storage on first use
    pub async fn session(&self) -> Option<ProviderSession> {
        if let Some(session) = self.session.read().await.clone() {
            return Some(session);
        }

        let storage = self.storage.as_ref()?;
        let raw = match storage.get_item(AUTH_SESSION_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Failed to read stored auth session: {}", e);
                return None;
            }
        };
        match serde_json::from_str::<ProviderSession>(&raw) {
            Ok(session) => {
                *self.session.write().await = Some(session.clone());
                Some(session)
            }
            Err(e) => {
                tracing::warn!("Discarding unreadable auth session: {}", e);
                None
            }
        }
    }

    async fn set_session(&self, session: Option<ProviderSession>) {
        if let Some(storage) = &self.storage {
            let result = match &session {
                Some(s) => match serde_json::to_string(s) {
                    Ok(json) => storage.set_item(AUTH_SESSION_KEY, &json).await,
                    Err(e) => Err(e.into()),
                },
                None => storage.remove_item(AUTH_SESSION_KEY).await,
            };
            if let Err(e) = result {
                tracing::warn!("Failed to persist auth session: {}", e);
            }
        }
        *self.session.write().await = session;
    }

    /// Attach `apikey` and bearer headers; the bearer is the user's token when signed in
    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let bearer = match self.session().await {
            Some(session) => session.access_token,
            None => self.config.anon_key().to_string(),
        };
        builder
            .header("apikey", self.config.anon_key())
            .bearer_auth(bearer)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        let response = self.authorized(builder).await.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

fn parse_sign_up(value: Value) -> Result<SignUpOutcome, ServiceError> {
    if value.get("access_token").is_some() {
        let session: ProviderSession = serde_json::from_value(value)?;
        return Ok(SignUpOutcome {
            user: session.user.clone(),
            session: Some(session),
        });
    }
    // unconfirmed sign-ups answer with the bare user, some versions wrap it
    let user_value = match value.get("user") {
        Some(user) => user.clone(),
        None => value,
    };
    Ok(SignUpOutcome {
        user: serde_json::from_value(user_value)?,
        session: None,
    })
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ServiceError> {
        let request = self
            .http
            .post(self.config.auth_url("/token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let session: ProviderSession = self.send(request).await?.json().await?;
        self.set_session(Some(session.clone())).await;
        tracing::info!("Signed in {}", session.user.id);
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        phone: Option<&str>,
    ) -> Result<SignUpOutcome, ServiceError> {
        let request = self.http.post(self.config.auth_url("/signup")).json(&json!({
            "email": email,
            "password": password,
            "data": { "name": name, "phone": phone },
        }));

        let value: Value = self.send(request).await?.json().await?;
        let outcome = parse_sign_up(value)?;
        if let Some(session) = &outcome.session {
            self.set_session(Some(session.clone())).await;
        }
        tracing::info!("Signed up {}", outcome.user.id);
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        if self.session().await.is_none() {
            return Ok(());
        }
        let request = self.http.post(self.config.auth_url("/logout"));
        let result = self.send(request).await.map(|_| ());
        // the local session goes away even if the server call failed
        self.set_session(None).await;
        result
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), ServiceError> {
        let mut request = self.http.post(self.config.auth_url("/recover"));
        if let Some(redirect) = redirect_to {
            request = request.query(&[("redirect_to", redirect)]);
        }
        self.send(request.json(&json!({ "email": email })))
            .await
            .map(|_| ())
    }

    async fn current_user(&self) -> Result<Option<ProviderUser>, ServiceError> {
        if self.session().await.is_none() {
            return Ok(None);
        }
        let request = self.http.get(self.config.auth_url("/user"));
        match self.send(request).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(ServiceError::Provider { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16() =>
            {
                tracing::info!("Stored auth session rejected ({}), clearing it", status);
                self.set_session(None).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl UserStore for SupabaseClient {
    async fn select_user(&self, id: &str) -> Result<UserRow, ServiceError> {
        let request = self
            .http
            .get(self.config.rest_url(USERS_TABLE))
            .query(&[("id", format!("eq.{id}")), ("select", "*".to_string())])
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT);

        match self.send(request).await {
            Ok(response) => Ok(response.json().await?),
            // PostgREST answers 406 when a single-object select matches no rows
            Err(ServiceError::Provider { status, .. })
                if status == StatusCode::NOT_ACCEPTABLE.as_u16() =>
            {
                Err(ServiceError::not_found(format!("users.id = {id}")))
            }
            Err(e) => Err(e),
        }
    }

    async fn insert_user(&self, row: &UserRow) -> Result<(), ServiceError> {
        let request = self
            .http
            .post(self.config.rest_url(USERS_TABLE))
            .header("Prefer", "return=minimal")
            .json(row);
        self.send(request).await.map(|_| ())
    }

    async fn update_user(&self, id: &str, patch: &UserPatch) -> Result<(), ServiceError> {
        let request = self
            .http
            .patch(self.config.rest_url(USERS_TABLE))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=minimal")
            .json(patch);
        self.send(request).await.map(|_| ())
    }
}
