//! Integration tests for the WebAuthn passkey ceremonies.

#![allow(clippy::unwrap_used)]

use auth_client::codec;
use auth_client::mocks::{MockAuthProvider, MockCookieJar, MockCredentialSource, MockTransport};
use auth_client::providers::CeremonyError;
use auth_client::state::AuthMode;
use auth_client::store::AuthStateStore;
use auth_client::{AuthContext, AuthError, AuthFetch, ClientConfig, SessionManager};
use serde_json::json;
use std::sync::Arc;

struct Harness {
    transport: MockTransport,
    credentials: MockCredentialSource,
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
    let context = Arc::new(AuthContext::new(ClientConfig::default(), move |_| {
        Ok(MockAuthProvider::new())
    }));
    let credentials = MockCredentialSource::new();
    let manager = SessionManager::new(context, fetch, credentials.clone());
    Harness {
        transport,
        credentials,
        manager,
    }
}

fn authentication_options() -> serde_json::Value {
    json!({
        "challenge": codec::encode(b"auth-challenge"),
        "rpId": "example.com",
        "allowCredentials": [{ "id": codec::encode(&[1, 2, 3, 4]) }],
        "timeout": 60_000,
        "userVerification": "preferred",
        "challengeId": "ch-auth-1",
    })
}

fn registration_options() -> serde_json::Value {
    json!({
        "challenge": codec::encode(b"reg-challenge"),
        "rp": { "id": "example.com", "name": "Example" },
        "user": {
            "id": codec::encode(b"user-1"),
            "name": "user@example.com",
            "displayName": "User",
        },
        "excludeCredentials": [{ "id": codec::encode(&[9, 9, 9]) }],
        "timeout": 60_000,
        "attestation": "none",
        "challengeId": "ch-reg-1",
    })
}

fn user_body() -> serde_json::Value {
    json!({ "id": "u1", "email": "user@example.com" })
}

#[tokio::test]
async fn test_authentication_success_adopts_cookie_session() {
    let h = harness();
    h.transport.enqueue_json(200, authentication_options());
    h.transport
        .enqueue_json(200, json!({ "user": user_body() }));

    let user = h.manager.authenticate_with_passkey().await.unwrap();

    assert_eq!(user.unwrap().id, "u1");
    assert_eq!(h.manager.mode(), AuthMode::Cookie);
    assert!(h.manager.is_authenticated());

    // The platform ceremony received the decoded challenge and the
    // decoded allow-list.
    let options = h.credentials.get_options();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].challenge, b"auth-challenge");
    assert_eq!(options[0].rp_id.as_deref(), Some("example.com"));
    assert_eq!(options[0].allowed_credentials, vec![vec![1, 2, 3, 4]]);
}

#[tokio::test]
async fn test_authentication_posts_the_encoded_assertion() {
    let h = harness();
    h.transport.enqueue_json(200, authentication_options());
    h.transport
        .enqueue_json(200, json!({ "user": user_body() }));

    h.manager.authenticate_with_passkey().await.unwrap();

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].url.ends_with("/passkey/verify-authentication"));

    let assertion = MockCredentialSource::sample_assertion();
    let body = requests[1].body.clone().unwrap();
    assert_eq!(body["rawId"], codec::encode(&assertion.raw_id));
    assert_eq!(body["type"], "public-key");
    assert_eq!(
        body["response"]["authenticatorData"],
        codec::encode(&assertion.authenticator_data)
    );
    assert_eq!(
        body["response"]["signature"],
        codec::encode(&assertion.signature)
    );
    assert_eq!(body["challengeId"], "ch-auth-1");
}

#[tokio::test]
async fn test_authentication_with_bare_token_adopts_jwt_and_recovers_user() {
    let h = harness();
    h.transport.enqueue_json(200, authentication_options());
    h.transport
        .enqueue_json(200, json!({ "token": "ceremony-token" }));
    // Supplementary session fetch to recover the user.
    h.transport
        .enqueue_json(200, json!({ "user": user_body() }));

    let user = h.manager.authenticate_with_passkey().await.unwrap();

    assert_eq!(user.unwrap().id, "u1");
    assert_eq!(h.manager.mode(), AuthMode::Jwt);
    assert_eq!(h.manager.jwt_token(), Some("ceremony-token".to_string()));
    assert_eq!(h.transport.calls_to("/get-session"), 1);
}

#[tokio::test]
async fn test_authentication_token_adoption_tolerates_session_fetch_failure() {
    let h = harness();
    h.transport.enqueue_json(200, authentication_options());
    h.transport
        .enqueue_json(200, json!({ "token": "ceremony-token" }));
    h.transport.enqueue_error("offline");

    let user = h.manager.authenticate_with_passkey().await.unwrap();

    // Ceremony still succeeded; the caller may re-validate later.
    assert!(user.is_none());
    assert_eq!(h.manager.mode(), AuthMode::Jwt);
    assert_eq!(h.manager.jwt_token(), Some("ceremony-token".to_string()));
}

#[tokio::test]
async fn test_authentication_with_empty_verification_is_invalid() {
    let h = harness();
    h.transport.enqueue_json(200, authentication_options());
    h.transport.enqueue_json(200, json!({}));

    let result = h.manager.authenticate_with_passkey().await;

    assert!(matches!(result, Err(AuthError::InvalidPayload(_))));
    assert!(!h.manager.is_authenticated());
}

#[tokio::test]
async fn test_cancelled_ceremony_is_a_distinct_abort_outcome() {
    let h = harness();
    h.transport.enqueue_json(200, authentication_options());
    h.credentials.set_get_outcome(Err(CeremonyError::Cancelled));

    let result = h.manager.authenticate_with_passkey().await;

    match result {
        Err(error) => {
            assert!(matches!(error, AuthError::CeremonyAborted));
            assert!(error.is_ceremony_outcome());
        }
        Ok(_) => panic!("cancelled ceremony must not succeed"),
    }
    // Nothing was posted for verification.
    assert_eq!(h.transport.requests().len(), 1);
}

#[tokio::test]
async fn test_server_rejection_surfaces_its_message() {
    let h = harness();
    h.transport.enqueue_json(200, authentication_options());
    h.transport
        .enqueue_json(400, json!({ "message": "challenge expired" }));

    let result = h.manager.authenticate_with_passkey().await;

    match result {
        Err(AuthError::VerificationRejected { message }) => {
            assert_eq!(message, "challenge expired");
        }
        other => panic!("expected verification rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_registration_success_posts_encoded_attestation() {
    let h = harness();
    h.transport.enqueue_json(200, registration_options());
    h.transport.enqueue_json(200, json!({ "status": "ok" }));

    h.manager.register_passkey(Some("laptop")).await.unwrap();

    // The platform received decoded challenge, user id and exclude list.
    let options = h.credentials.create_options();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].challenge, b"reg-challenge");
    assert_eq!(options[0].user_id, b"user-1");
    assert_eq!(options[0].user_name, "user@example.com");
    assert_eq!(options[0].exclude_credentials, vec![vec![9, 9, 9]]);

    let registration = MockCredentialSource::sample_registration();
    let requests = h.transport.requests();
    assert!(requests[1].url.ends_with("/passkey/verify-registration"));
    let body = requests[1].body.clone().unwrap();
    assert_eq!(
        body["response"]["attestationObject"],
        codec::encode(&registration.attestation_object)
    );
    assert_eq!(body["response"]["transports"], json!(["internal"]));
    assert_eq!(body["name"], "laptop");
    assert_eq!(body["challengeId"], "ch-reg-1");
}

#[tokio::test]
async fn test_registration_duplicate_is_its_own_failure_category() {
    let h = harness();
    h.transport.enqueue_json(200, registration_options());
    h.credentials
        .set_create_outcome(Err(CeremonyError::DuplicateCredential));

    let result = h.manager.register_passkey(None).await;

    assert!(matches!(result, Err(AuthError::DuplicateCredential)));
}

#[tokio::test]
async fn test_registration_platform_failure_maps_to_ceremony_failed() {
    let h = harness();
    h.transport.enqueue_json(200, registration_options());
    h.credentials
        .set_create_outcome(Err(CeremonyError::Failed("NotAllowedError".to_string())));

    let result = h.manager.register_passkey(None).await;

    match result {
        Err(AuthError::CeremonyFailed(message)) => {
            assert!(message.contains("NotAllowedError"));
        }
        other => panic!("expected ceremony failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_challenge_is_an_invalid_payload() {
    let h = harness();
    h.transport.enqueue_json(
        200,
        json!({ "challenge": "not base64url!!", "challengeId": "ch-1" }),
    );

    let result = h.manager.authenticate_with_passkey().await;

    assert!(matches!(result, Err(AuthError::InvalidPayload(_))));
}
