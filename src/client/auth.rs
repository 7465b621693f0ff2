/**
 * Authentication Session Module
 *
 * Holds the session state (current profile, loading flag, last error) and
 * the operations that drive it: bootstrap, login, register, logout, profile
 * updates, provider linking and password reset. Every operation delegates to
 * the auth provider or row store, then mirrors the profile into local storage.
 */

use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use tokio::sync::RwLock;

use crate::client::config::Config;
use crate::client::local_store::{LocalStorage, SessionCache};
use crate::client::provider::{AuthProvider, EmailService, SheetSync, UserStore};
use crate::client::side_effects::{
    BackgroundTasks, DisabledEmail, DisabledSheetSync, HttpEmailService, HttpSheetSync,
    RetryReport,
};
use crate::client::supabase::SupabaseClient;
use crate::client::types::{
    AdminOutcome, AuthResult, AuthUser, ProfileUpdate, RegisterRequest, UserPatch, UserRole,
    UserRow,
};
use crate::shared::config::RetryPolicy;
use crate::shared::error::ServiceError;

/// Authentication state
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub is_loading: bool,
    pub auth_error: Option<String>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true,
            auth_error: None,
        }
    }
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    pub fn is_provider(&self) -> bool {
        self.has_role(UserRole::Provider)
    }

    fn has_role(&self, role: UserRole) -> bool {
        self.user.as_ref().is_some_and(|u| u.role == role)
    }

    pub fn clear_error(&mut self) {
        self.auth_error = None;
    }

    pub fn set_error(&mut self, error: String) {
        self.auth_error = Some(error);
    }
}

/// Builder wiring an [`AuthSession`] to its collaborators
pub struct AuthSessionBuilder {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn UserStore>,
    storage: Arc<dyn LocalStorage>,
    email: Arc<dyn EmailService>,
    sheets: Arc<dyn SheetSync>,
    retry: RetryPolicy,
    password_reset_redirect: Option<String>,
}

impl AuthSessionBuilder {
    pub fn email(mut self, email: Arc<dyn EmailService>) -> Self {
        self.email = email;
        self
    }

    pub fn sheets(mut self, sheets: Arc<dyn SheetSync>) -> Self {
        self.sheets = sheets;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn password_reset_redirect(mut self, url: impl Into<String>) -> Self {
        self.password_reset_redirect = Some(url.into());
        self
    }

    pub fn build(self) -> AuthSession {
        AuthSession {
            provider: self.provider,
            store: self.store,
            email: self.email,
            sheets: self.sheets,
            cache: SessionCache::new(self.storage),
            tasks: BackgroundTasks::new(self.retry),
            state: Arc::new(RwLock::new(AuthState::new())),
            password_reset_redirect: self.password_reset_redirect,
        }
    }
}

/// Client-side authentication session.
///
/// Cloning yields another handle onto the same state. Operations are not
/// serialized against each other: concurrent calls interleave and the last
/// writer wins on both state and local storage.
#[derive(Clone)]
pub struct AuthSession {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn UserStore>,
    email: Arc<dyn EmailService>,
    sheets: Arc<dyn SheetSync>,
    cache: SessionCache,
    tasks: BackgroundTasks,
    state: Arc<RwLock<AuthState>>,
    password_reset_redirect: Option<String>,
}

impl AuthSession {
    /// Start wiring a session; email and sheet sync default to disabled
    pub fn builder(
        provider: Arc<dyn AuthProvider>,
        store: Arc<dyn UserStore>,
        storage: Arc<dyn LocalStorage>,
    ) -> AuthSessionBuilder {
        AuthSessionBuilder {
            provider,
            store,
            storage,
            email: Arc::new(DisabledEmail),
            sheets: Arc::new(DisabledSheetSync),
            retry: RetryPolicy::default(),
            password_reset_redirect: None,
        }
    }

    /// Wire a session against a Supabase project and the configured side-effect endpoints
    pub fn from_config(config: &Config, storage: Arc<dyn LocalStorage>) -> Result<Self, ServiceError> {
        let supabase = Arc::new(SupabaseClient::new(config.clone())?.with_storage(Arc::clone(&storage)));
        let http: Client = supabase.http().clone();

        let mut builder = Self::builder(supabase.clone(), supabase, storage).retry(config.retry_policy());
        if let Some(url) = config.email_service_url() {
            builder = builder.email(Arc::new(HttpEmailService::new(http.clone(), url)));
        }
        if let Some(url) = config.sheets_sync_url() {
            builder = builder.sheets(Arc::new(HttpSheetSync::new(http, url)));
        }
        if let Some(url) = config.password_reset_redirect() {
            builder = builder.password_reset_redirect(url);
        }
        Ok(builder.build())
    }

    /// Snapshot of the current state
    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn user(&self) -> Option<AuthUser> {
        self.state.read().await.user.clone()
    }

    /// Profile last written to local storage, without touching session state
    pub async fn cached_user(&self) -> Option<AuthUser> {
        match self.cache.load_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Ignoring unreadable cached user: {}", e);
                None
            }
        }
    }

    /// Wait for every spawned email/sheet task to finish
    pub async fn wait_for_side_effects(&self) -> Vec<RetryReport> {
        self.tasks.wait_idle().await
    }

    /// Populate state from an existing provider session, if there is one
    pub async fn initialize(&self) {
        match self.provider.current_user().await {
            Ok(Some(user)) => {
                tracing::info!("Restoring session for {}", user.id);
                self.fetch_user_profile(&user.id).await;
            }
            Ok(None) => {
                tracing::debug!("No provider session, starting anonymous");
                self.state.write().await.is_loading = false;
            }
            Err(e) => {
                tracing::warn!("Could not read provider session: {}", e);
                self.state.write().await.is_loading = false;
            }
        }
    }

    /// Load the profile row for `id` into state and local storage.
    ///
    /// Failures are logged and swallowed: the state ends loading-complete with
    /// no user and the cached profile is dropped, even when the provider
    /// session is valid.
    pub async fn fetch_user_profile(&self, id: &str) -> Option<AuthUser> {
        let user = match self
            .store
            .select_user(id)
            .await
            .and_then(AuthUser::try_from)
        {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(user_id = id, "Profile fetch failed, staying anonymous: {}", e);
                {
                    let mut state = self.state.write().await;
                    state.user = None;
                    state.is_loading = false;
                }
                if let Err(e) = self.cache.clear_user().await {
                    tracing::warn!("Failed to clear cached user: {}", e);
                }
                return None;
            }
        };

        {
            let mut state = self.state.write().await;
            state.user = Some(user.clone());
            state.is_loading = false;
        }
        self.persist(&user).await;
        Some(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult {
        self.begin().await;

        match self.provider.sign_in_with_password(email, password).await {
            Ok(session) => {
                self.fetch_user_profile(&session.user.id).await;
                AuthResult::ok()
            }
            Err(e) => self.fail(e).await,
        }
    }

    /// Sign up, insert the profile row, then kick off the welcome email and
    /// sheet sync in the background.
    pub async fn register(&self, request: RegisterRequest) -> AuthResult {
        self.begin().await;

        let outcome = match self
            .provider
            .sign_up(&request.email, &request.password, &request.name, request.phone.as_deref())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(e).await,
        };

        let row = request.to_row(outcome.user.id.clone(), Utc::now());
        if let Err(e) = self.store.insert_user(&row).await {
            return self.fail(e).await;
        }

        let email = Arc::clone(&self.email);
        let address = request.email.clone();
        let name = request.name.clone();
        self.tasks.spawn("welcome_email", move || {
            let email = Arc::clone(&email);
            let address = address.clone();
            let name = name.clone();
            async move { email.send_welcome_email(&address, &name).await }
        });
        self.spawn_sheet_sync(row.clone());

        self.fetch_user_profile(&row.id).await;
        AuthResult::ok()
    }

    /// Sign out and forget the user locally, whatever the provider says
    pub async fn logout(&self) {
        if let Err(e) = self.provider.sign_out().await {
            tracing::warn!("Provider sign-out failed: {}", e);
        }

        {
            let mut state = self.state.write().await;
            state.user = None;
            state.auth_error = None;
            state.is_loading = false;
        }
        if let Err(e) = self.cache.clear_user().await {
            tracing::warn!("Failed to clear cached user: {}", e);
        }
    }

    /// Patch the current profile; a no-op when nobody is signed in
    pub async fn update_user(&self, update: ProfileUpdate) {
        self.patch_current_user(update, "update").await;
    }

    /// Attach an external identity to the current profile
    pub async fn link_provider_account(&self, provider_id: &str) {
        self.patch_current_user(ProfileUpdate::link_provider(provider_id), "link_provider")
            .await;
    }

    pub async fn request_password_reset(&self, email: &str) -> AuthResult {
        match self
            .provider
            .reset_password_for_email(email, self.password_reset_redirect.as_deref())
            .await
        {
            Ok(()) => AuthResult::ok(),
            Err(e) => {
                tracing::warn!("Password reset request failed: {}", e);
                AuthResult::failed(e.user_message())
            }
        }
    }

    /// Admin listing; there is no backing query yet
    pub async fn get_all_users(&self) -> Vec<AuthUser> {
        tracing::debug!("get_all_users has no backing implementation");
        Vec::new()
    }

    /// Admin activation toggle; there is no backing call yet
    pub async fn update_user_status(&self, user_id: &str, is_active: bool) -> AdminOutcome {
        tracing::info!(user_id, is_active, "update_user_status requested, not implemented");
        AdminOutcome::NotImplemented
    }

    async fn begin(&self) {
        let mut state = self.state.write().await;
        state.clear_error();
        state.is_loading = true;
    }

    async fn fail(&self, error: ServiceError) -> AuthResult {
        let message = error.user_message();
        tracing::warn!("Authentication failed: {}", error);
        let mut state = self.state.write().await;
        state.set_error(message.clone());
        state.is_loading = false;
        AuthResult::failed(message)
    }

    async fn persist(&self, user: &AuthUser) {
        if let Err(e) = self.cache.store_user(user).await {
            tracing::warn!("Failed to cache user {}: {}", user.id, e);
        }
    }

    fn spawn_sheet_sync(&self, row: UserRow) {
        let sheets = Arc::clone(&self.sheets);
        self.tasks.spawn("sheet_sync", move || {
            let sheets = Arc::clone(&sheets);
            let row = row.clone();
            async move { sheets.sync_user(&row).await }
        });
    }

    async fn patch_current_user(&self, update: ProfileUpdate, action: &'static str) {
        let Some(mut user) = self.user().await else {
            tracing::debug!(action, "No signed-in user, skipping");
            return;
        };

        let now = Utc::now();
        let patch = UserPatch {
            fields: update.clone(),
            last_login: now.to_rfc3339(),
        };
        if let Err(e) = self.store.update_user(&user.id, &patch).await {
            tracing::warn!(action, user_id = %user.id, "Profile update failed: {}", e);
            return;
        }

        // merged onto the snapshot taken above, so a concurrent update can be lost
        user.apply(&update, now);
        self.state.write().await.user = Some(user.clone());
        self.persist(&user).await;
        self.spawn_sheet_sync(user.to_row());
    }
}
