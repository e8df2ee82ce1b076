//! Integration tests for the session orchestrator: credential flows,
//! mode adoption, session validation and feature flags.

#![allow(clippy::unwrap_used)]

use auth_client::codec;
use auth_client::mocks::{MockAuthProvider, MockCookieJar, MockCredentialSource, MockTransport};
use auth_client::providers::{ProviderSession, SignInResult};
use auth_client::state::{AuthMode, User};
use auth_client::store::AuthStateStore;
use auth_client::{AuthContext, AuthError, AuthFetch, ClientConfig, SessionManager};
use serde_json::json;
use std::sync::Arc;

struct Harness {
    transport: MockTransport,
    provider: MockAuthProvider,
    manager: SessionManager<MockAuthProvider, MockTransport, MockCookieJar, MockCredentialSource>,
}

fn harness() -> Harness {
    let jar = MockCookieJar::new();
    let store = AuthStateStore::new(Arc::new(jar));
    let transport = MockTransport::new();
    let fetch = AuthFetch::new(
        Arc::new(transport.clone()),
        store,
        "/api/auth".to_string(),
    );

    let provider = MockAuthProvider::new();
    let factory_provider = provider.clone();
    let context = Arc::new(AuthContext::new(ClientConfig::default(), move |_| {
        Ok(factory_provider.clone())
    }));

    let manager = SessionManager::new(context, fetch, MockCredentialSource::new());
    Harness {
        transport,
        provider,
        manager,
    }
}

fn test_user() -> User {
    User::new("u1".to_string(), "user@example.com".to_string())
}

#[tokio::test]
async fn test_plaintext_password_never_reaches_the_provider() {
    let h = harness();
    h.provider.set_sign_in_result(Ok(SignInResult {
        user: Some(test_user()),
        token: Some("issued".to_string()),
        two_factor_redirect: false,
    }));

    h.manager
        .sign_in_email("user@example.com", "hunter2")
        .await
        .unwrap();

    let arguments = h.provider.all_arguments();
    assert!(arguments.contains(&codec::digest("hunter2")));
    assert!(!arguments.contains(&"hunter2".to_string()));
}

#[tokio::test]
async fn test_sign_in_with_cookie_session_prefetches_fallback_token() {
    let h = harness();
    h.provider.set_sign_in_result(Ok(SignInResult {
        user: Some(test_user()),
        token: None,
        two_factor_redirect: false,
    }));
    h.transport
        .enqueue_json(200, json!({ "token": "fallback" }));

    let result = h
        .manager
        .sign_in_email("user@example.com", "hunter2")
        .await
        .unwrap();

    assert!(result.user.is_some());
    assert_eq!(h.manager.mode(), AuthMode::Cookie);
    assert!(h.manager.is_authenticated());
    // Token pre-fetched proactively, but cookie mode retained.
    assert_eq!(h.manager.jwt_token(), Some("fallback".to_string()));
    assert_eq!(h.transport.calls_to("/token"), 1);
}

#[tokio::test]
async fn test_sign_in_with_direct_token_adopts_jwt_mode() {
    let h = harness();
    h.provider.set_sign_in_result(Ok(SignInResult {
        user: Some(test_user()),
        token: Some("direct-token".to_string()),
        two_factor_redirect: false,
    }));

    h.manager
        .sign_in_email("user@example.com", "hunter2")
        .await
        .unwrap();

    assert_eq!(h.manager.mode(), AuthMode::Jwt);
    assert_eq!(h.manager.jwt_token(), Some("direct-token".to_string()));
    // No prefetch when the provider already issued a token.
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn test_two_factor_challenge_defers_session_adoption() {
    let h = harness();
    h.provider.set_sign_in_result(Ok(SignInResult {
        user: None,
        token: None,
        two_factor_redirect: true,
    }));

    let result = h
        .manager
        .sign_in_email("user@example.com", "hunter2")
        .await
        .unwrap();

    // The caller learns about the pending challenge; local state stays
    // logged out and no token is pre-fetched.
    assert!(result.two_factor_redirect);
    assert!(!h.manager.is_authenticated());
    assert_eq!(h.manager.jwt_token(), None);
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn test_sign_in_rejection_leaves_state_untouched() {
    let h = harness();
    h.provider
        .set_sign_in_result(Err(AuthError::Unauthorized));

    let result = h.manager.sign_in_email("user@example.com", "wrong").await;

    assert!(matches!(result, Err(AuthError::Unauthorized)));
    assert!(!h.manager.is_authenticated());
    assert_eq!(h.manager.mode(), AuthMode::Cookie);
}

#[tokio::test]
async fn test_sign_up_adopts_mode_like_sign_in() {
    let h = harness();
    h.provider.set_sign_up_result(Ok(SignInResult {
        user: Some(test_user()),
        token: None,
        two_factor_redirect: false,
    }));
    h.transport
        .enqueue_json(200, json!({ "token": "fallback" }));

    h.manager
        .sign_up_email("user@example.com", "hunter2", "New User")
        .await
        .unwrap();

    assert_eq!(h.manager.mode(), AuthMode::Cookie);
    assert_eq!(h.manager.jwt_token(), Some("fallback".to_string()));
}

#[tokio::test]
async fn test_sign_out_clears_locally_even_when_remote_fails() {
    let h = harness();
    h.manager.set_user(Some(test_user()), AuthMode::Jwt);
    h.manager.store().set_token(Some("stale-token"));
    h.provider
        .set_sign_out_result(Err(AuthError::Transport("connection reset".to_string())));

    h.manager.sign_out().await;

    assert!(!h.manager.is_authenticated());
    assert_eq!(h.manager.mode(), AuthMode::Cookie);
    assert_eq!(h.manager.jwt_token(), None);
}

#[tokio::test]
async fn test_validate_session_adopts_provider_session() {
    let h = harness();
    h.provider.set_session(Ok(ProviderSession {
        user: Some(test_user()),
        token: None,
    }));
    h.transport
        .enqueue_json(200, json!({ "token": "fallback" }));

    assert!(h.manager.validate_session().await);
    assert!(h.manager.is_authenticated());
    assert_eq!(h.manager.mode(), AuthMode::Cookie);
    assert_eq!(h.manager.jwt_token(), Some("fallback".to_string()));
}

#[tokio::test]
async fn test_validate_session_trusts_local_user_over_empty_read() {
    let h = harness();
    // Local state set immediately after a 2FA completion; the provider's
    // session read has not caught up yet.
    h.manager.set_user(Some(test_user()), AuthMode::Cookie);
    h.provider.set_session(Ok(ProviderSession::default()));

    assert!(h.manager.validate_session().await);
    assert!(h.manager.is_authenticated());
}

#[tokio::test]
async fn test_validate_session_reports_false_for_anonymous_empty_read() {
    let h = harness();
    h.provider.set_session(Ok(ProviderSession::default()));

    assert!(!h.manager.validate_session().await);
}

#[tokio::test]
async fn test_validate_session_error_falls_back_to_local_state() {
    let h = harness();
    h.manager.set_user(Some(test_user()), AuthMode::Cookie);
    h.provider
        .set_session(Err(AuthError::Transport("offline".to_string())));

    assert!(h.manager.validate_session().await);

    h.manager.clear_user();
    assert!(!h.manager.validate_session().await);
}

#[tokio::test]
async fn test_refresh_jwt_token_is_a_noop_outside_jwt_mode() {
    let h = harness();
    h.manager.set_user(Some(test_user()), AuthMode::Cookie);

    assert!(!h.manager.refresh_jwt_token().await);
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn test_refresh_jwt_token_reissues_in_jwt_mode() {
    let h = harness();
    h.manager.set_user(Some(test_user()), AuthMode::Jwt);
    h.manager.store().set_token(Some("old-token"));
    h.transport
        .enqueue_json(200, json!({ "token": "new-token" }));

    assert!(h.manager.refresh_jwt_token().await);
    assert_eq!(h.manager.jwt_token(), Some("new-token".to_string()));
    assert_eq!(h.transport.calls_to("/token"), 1);
}

#[tokio::test]
async fn test_features_are_fetched_once_and_cached() {
    let h = harness();
    h.transport
        .enqueue_json(200, json!({ "boards": true, "invites": false }));

    let features = h.manager.fetch_features().await;
    assert_eq!(features.get("boards"), Some(&true));

    // Second call answers from the cache; the queue is empty, so a real
    // request would error out.
    let cached = h.manager.fetch_features().await;
    assert_eq!(cached.get("boards"), Some(&true));
    assert_eq!(h.transport.calls_to("/features"), 1);

    assert!(h.manager.feature_enabled("boards"));
    assert!(!h.manager.feature_enabled("invites"));
    assert!(!h.manager.feature_enabled("unknown"));
}

#[tokio::test]
async fn test_feature_fetch_failure_yields_empty_without_raising() {
    let h = harness();
    h.transport.enqueue_error("offline");

    let features = h.manager.fetch_features().await;
    assert!(features.is_empty());
    assert!(!h.manager.feature_enabled("boards"));

    // Failures are not cached; a later attempt succeeds.
    h.transport.enqueue_json(200, json!({ "boards": true }));
    let features = h.manager.fetch_features().await;
    assert_eq!(features.get("boards"), Some(&true));
}

#[tokio::test]
async fn test_loading_flag_resets_after_each_operation() {
    let h = harness();
    h.provider.set_sign_in_result(Ok(SignInResult {
        user: Some(test_user()),
        token: Some("issued".to_string()),
        two_factor_redirect: false,
    }));

    assert!(!h.manager.is_loading());
    h.manager
        .sign_in_email("user@example.com", "hunter2")
        .await
        .unwrap();
    assert!(!h.manager.is_loading());

    h.provider
        .set_sign_out_result(Err(AuthError::Transport("offline".to_string())));
    h.manager.sign_out().await;
    assert!(!h.manager.is_loading());
}
