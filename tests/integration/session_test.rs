//! Session behaviour against in-memory collaborators

use authsync::client::local_store::{LocalStorage, CURRENT_USER_KEY};
use authsync::client::{AdminOutcome, AuthUser, ProfileUpdate, RegisterRequest, UserRole};
use authsync::shared::ServiceError;
use pretty_assertions::assert_eq;

use crate::common::{FakeEmail, FakeSheets, Harness};

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "correct horse".to_string(),
        name: "Grace Hopper".to_string(),
        phone: Some("+15550199".to_string()),
        role: UserRole::Provider,
    }
}

async fn stored_user(harness: &Harness) -> Option<AuthUser> {
    harness
        .storage
        .get_item(CURRENT_USER_KEY)
        .await
        .unwrap()
        .map(|json| serde_json::from_str(&json).unwrap())
}

#[tokio::test]
async fn test_login_populates_state_and_storage() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;

    let result = harness.session.login("ada@example.com", "secret").await;

    assert!(result.success);
    assert!(result.error.is_none());

    let state = harness.session.state().await;
    assert!(!state.is_loading);
    assert!(state.is_authenticated());
    let user = state.user.unwrap();
    assert_eq!(user.id, "u-1");
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.name, "Ada Lovelace");
    assert_eq!(user.phone.as_deref(), Some("+15550100"));
    assert_eq!(user.role, UserRole::User);
    assert_eq!(user.provider_id, None);
    assert_eq!(user.created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    assert_eq!(user.last_login.to_rfc3339(), "2024-03-02T08:30:00+00:00");
    assert!(user.is_active);

    assert_eq!(stored_user(&harness).await, Some(user.clone()));
    let raw = harness.storage.get_item(CURRENT_USER_KEY).await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["isActive"], true);
    assert_eq!(json["providerId"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_failed_login_sets_error_and_leaves_user_empty() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;

    let result = harness.session.login("ada@example.com", "wrong").await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Invalid login credentials"));

    let state = harness.session.state().await;
    assert!(state.user.is_none());
    assert!(!state.is_loading);
    assert_eq!(state.auth_error.as_deref(), Some("Invalid login credentials"));
    assert!(stored_user(&harness).await.is_none());
}

#[tokio::test]
async fn test_successful_login_clears_previous_error() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;

    harness.session.login("ada@example.com", "wrong").await;
    harness.session.login("ada@example.com", "secret").await;

    assert!(harness.session.state().await.auth_error.is_none());
}

#[tokio::test]
async fn test_login_with_missing_profile_stays_anonymous() {
    let harness = Harness::new();
    harness
        .provider
        .add_account("orphan@example.com", "secret", "u-orphan")
        .await;

    let result = harness.session.login("orphan@example.com", "secret").await;

    // provider accepted the credentials, the profile row is missing
    assert!(result.success);
    let state = harness.session.state().await;
    assert!(state.user.is_none());
    assert!(!state.is_loading);
    assert!(state.auth_error.is_none());
}

#[tokio::test]
async fn test_register_inserts_default_row_and_runs_side_effects() {
    let harness = Harness::new();

    let result = harness.session.register(register_request("grace@example.com")).await;
    assert!(result.success);

    let inserts = harness.store.inserts.lock().await.clone();
    assert_eq!(inserts.len(), 1);
    let row = &inserts[0];
    assert_eq!(row.id, "new-grace");
    assert_eq!(row.role, UserRole::Provider);
    assert!(row.is_active);
    assert!(row.provider_id.is_none());

    let user = harness.session.user().await.unwrap();
    assert_eq!(user.name, "Grace Hopper");
    assert_eq!(stored_user(&harness).await, Some(user));

    let reports = harness.session.wait_for_side_effects().await;
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.succeeded()));
    assert_eq!(
        harness.email.sent.lock().await.clone(),
        vec![("grace@example.com".to_string(), "Grace Hopper".to_string())]
    );
    assert_eq!(harness.sheets.synced.lock().await.len(), 1);
}

#[tokio::test]
async fn test_register_succeeds_when_side_effects_fail() {
    let harness = Harness::with_side_effects(FakeEmail::failing(), FakeSheets::failing());

    let result = harness.session.register(register_request("grace@example.com")).await;

    assert!(result.success);
    assert!(result.error.is_none());
    let inserts = harness.store.inserts.lock().await.clone();
    assert_eq!(inserts.len(), 1);
    assert!(inserts[0].is_active);
    assert!(inserts[0].provider_id.is_none());

    let reports = harness.session.wait_for_side_effects().await;
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| !r.succeeded()));
    // retry policy allows two attempts each
    assert_eq!(*harness.email.attempts.lock().await, 2);
    assert_eq!(*harness.sheets.attempts.lock().await, 2);

    assert!(harness.session.state().await.auth_error.is_none());
}

#[tokio::test]
async fn test_register_sign_up_error_is_returned() {
    let harness = Harness::new();
    *harness.provider.sign_up_error.lock().await =
        Some(ServiceError::provider(422, "User already registered"));

    let result = harness.session.register(register_request("grace@example.com")).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("User already registered"));
    assert!(harness.store.inserts.lock().await.is_empty());
    assert!(harness.session.wait_for_side_effects().await.is_empty());
}

#[tokio::test]
async fn test_register_insert_error_is_returned() {
    let harness = Harness::new();
    *harness.store.fail_insert.lock().await = true;

    let result = harness.session.register(register_request("grace@example.com")).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("duplicate key value"));
    assert_eq!(
        harness.session.state().await.auth_error.as_deref(),
        Some("duplicate key value")
    );
    assert!(harness.session.wait_for_side_effects().await.is_empty());
}

#[tokio::test]
async fn test_update_without_user_makes_no_calls() {
    let harness = Harness::new();

    harness
        .session
        .update_user(ProfileUpdate {
            name: Some("Nobody".to_string()),
            ..ProfileUpdate::default()
        })
        .await;
    harness.session.link_provider_account("google-1").await;

    assert_eq!(harness.store.call_count().await, 0);
    assert!(harness.session.wait_for_side_effects().await.is_empty());
    assert!(stored_user(&harness).await.is_none());
}

#[tokio::test]
async fn test_update_patches_merges_and_syncs() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;
    harness.session.login("ada@example.com", "secret").await;
    let before = harness.session.user().await.unwrap();

    harness
        .session
        .update_user(ProfileUpdate {
            name: Some("Ada King".to_string()),
            phone: Some(Some("+15550111".to_string())),
            ..ProfileUpdate::default()
        })
        .await;

    let updates = harness.store.updates.lock().await.clone();
    assert_eq!(updates.len(), 1);
    let (id, body) = &updates[0];
    assert_eq!(id, "u-1");
    assert_eq!(body["name"], "Ada King");
    assert_eq!(body["phone"], "+15550111");
    assert!(body.get("role").is_none());
    assert!(body["last_login"].is_string());

    let user = harness.session.user().await.unwrap();
    assert_eq!(user.name, "Ada King");
    assert_eq!(user.phone.as_deref(), Some("+15550111"));
    assert_eq!(user.email, before.email);
    assert!(user.last_login > before.last_login);
    assert_eq!(stored_user(&harness).await, Some(user.clone()));

    harness.session.wait_for_side_effects().await;
    let synced = harness.sheets.synced.lock().await.clone();
    assert_eq!(synced.len(), 1);
    assert_eq!(synced[0].name, "Ada King");
}

#[tokio::test]
async fn test_update_failure_leaves_state_alone() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;
    harness.session.login("ada@example.com", "secret").await;
    let before = harness.session.user().await;
    *harness.store.fail_update.lock().await = true;

    harness
        .session
        .update_user(ProfileUpdate {
            name: Some("Changed".to_string()),
            ..ProfileUpdate::default()
        })
        .await;

    assert_eq!(harness.session.user().await, before);
    assert_eq!(stored_user(&harness).await, before);
    assert!(harness.session.wait_for_side_effects().await.is_empty());
}

#[tokio::test]
async fn test_link_provider_account() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;
    harness.session.login("ada@example.com", "secret").await;

    harness.session.link_provider_account("google-oauth2|42").await;

    let updates = harness.store.updates.lock().await.clone();
    assert_eq!(updates[0].1["provider_id"], "google-oauth2|42");
    let user = harness.session.user().await.unwrap();
    assert_eq!(user.provider_id.as_deref(), Some("google-oauth2|42"));
    assert_eq!(
        stored_user(&harness).await.unwrap().provider_id.as_deref(),
        Some("google-oauth2|42")
    );
}

#[tokio::test]
async fn test_logout_clears_state_and_storage_even_on_provider_error() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;
    harness.session.login("ada@example.com", "secret").await;
    assert!(stored_user(&harness).await.is_some());
    *harness.provider.sign_out_error.lock().await = Some(ServiceError::network("offline"));

    harness.session.logout().await;

    let state = harness.session.state().await;
    assert!(state.user.is_none());
    assert!(!state.is_loading);
    assert!(stored_user(&harness).await.is_none());
    assert!(harness.provider.calls().await.contains(&"sign_out".to_string()));
}

#[tokio::test]
async fn test_initialize_restores_existing_session() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;
    *harness.provider.current.lock().await = Some(authsync::client::types::ProviderUser {
        id: "u-1".to_string(),
        email: Some("ada@example.com".to_string()),
    });

    assert!(harness.session.state().await.is_loading);
    harness.session.initialize().await;

    let state = harness.session.state().await;
    assert!(!state.is_loading);
    assert_eq!(state.user.unwrap().id, "u-1");
}

#[tokio::test]
async fn test_initialize_without_session_is_anonymous() {
    let harness = Harness::new();

    harness.session.initialize().await;

    let state = harness.session.state().await;
    assert!(!state.is_loading);
    assert!(state.user.is_none());
    assert_eq!(harness.store.call_count().await, 0);
}

#[tokio::test]
async fn test_initialize_provider_error_is_anonymous() {
    let harness = Harness::new();
    *harness.provider.current_error.lock().await = Some(ServiceError::network("dns failure"));

    harness.session.initialize().await;

    let state = harness.session.state().await;
    assert!(!state.is_loading);
    assert!(state.user.is_none());
    assert!(state.auth_error.is_none());
}

#[tokio::test]
async fn test_fetch_profile_select_error_is_swallowed() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;
    *harness.store.fail_select.lock().await = true;

    assert!(harness.session.fetch_user_profile("u-1").await.is_none());

    let state = harness.session.state().await;
    assert!(!state.is_loading);
    assert!(state.user.is_none());
    assert!(state.auth_error.is_none());
}

#[tokio::test]
async fn test_second_login_without_profile_drops_previous_user() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;
    harness.provider.add_account("bob@example.com", "hunter2", "u-2").await;
    harness.session.login("ada@example.com", "secret").await;
    assert_eq!(harness.session.user().await.unwrap().id, "u-1");
    assert!(stored_user(&harness).await.is_some());

    let result = harness.session.login("bob@example.com", "hunter2").await;

    assert!(result.success);
    let state = harness.session.state().await;
    assert!(state.user.is_none());
    assert!(!state.is_loading);
    assert!(!state.is_authenticated());
    assert!(stored_user(&harness).await.is_none());
}

#[tokio::test]
async fn test_password_reset_uses_redirect() {
    let harness = Harness::new();

    let result = harness.session.request_password_reset("ada@example.com").await;

    assert!(result.success);
    assert_eq!(
        harness.provider.reset_redirects.lock().await.clone(),
        vec![Some("https://app.example.com/reset-password".to_string())]
    );
}

#[tokio::test]
async fn test_password_reset_failure_message() {
    let harness = Harness::new();
    *harness.provider.reset_error.lock().await =
        Some(ServiceError::provider(429, "For security purposes, you can only request this once every 60 seconds"));

    let result = harness.session.request_password_reset("ada@example.com").await;

    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("For security purposes"));
    // password reset does not touch session state
    assert!(harness.session.state().await.auth_error.is_none());
}

#[tokio::test]
async fn test_admin_placeholders() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;
    harness.session.login("ada@example.com", "secret").await;
    let before = harness.session.state().await;

    assert!(harness.session.get_all_users().await.is_empty());
    assert_eq!(
        harness.session.update_user_status("u-1", false).await,
        AdminOutcome::NotImplemented
    );

    assert_eq!(harness.session.state().await, before);
    assert!(harness.store.updates.lock().await.is_empty());
}

#[tokio::test]
async fn test_cached_user_survives_without_touching_state() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;
    harness.session.login("ada@example.com", "secret").await;
    let user = harness.session.user().await;

    assert_eq!(harness.session.cached_user().await, user);

    harness.session.logout().await;
    assert!(harness.session.cached_user().await.is_none());
}

#[tokio::test]
async fn test_cloned_handles_share_state() {
    let harness = Harness::new()
        .with_account("ada@example.com", "secret", "u-1")
        .await;
    let other = harness.session.clone();

    harness.session.login("ada@example.com", "secret").await;

    assert!(other.state().await.is_authenticated());
}
