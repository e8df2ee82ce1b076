//! Session and passkey orchestrator.
//!
//! The composable-level state machine tying the store, the authenticated
//! fetch protocol, the auth client and the platform credential API
//! together: sign-in/up/out, session validation, JWT refresh, and the
//! two WebAuthn ceremonies.
//!
//! Error policy (see [`crate::error`]): recoverable conditions surface
//! as booleans or recognized error variants; nothing here panics, and
//! logout always succeeds locally even when the network call fails. The
//! loading flag is reset by an RAII guard regardless of outcome.

use crate::client::AuthContext;
use crate::codec;
use crate::error::{AuthError, Result};
use crate::fetch::AuthFetch;
use crate::providers::{
    AuthProvider, CookieJar, CredentialCreationOptions, CredentialRequestOptions,
    CredentialSource, HttpRequest, HttpResponse, HttpTransport, ProviderSession, SignInResult,
};
use crate::state::{AuthMode, AuthState, User};
use crate::store::AuthStateStore;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Passkey authentication-options endpoint.
pub const PASSKEY_AUTH_OPTIONS_ENDPOINT: &str = "/passkey/generate-authenticate-options";

/// Passkey authentication-verification endpoint.
pub const PASSKEY_AUTH_VERIFY_ENDPOINT: &str = "/passkey/verify-authentication";

/// Passkey registration-options endpoint.
pub const PASSKEY_REGISTER_OPTIONS_ENDPOINT: &str = "/passkey/generate-register-options";

/// Passkey registration-verification endpoint.
pub const PASSKEY_REGISTER_VERIFY_ENDPOINT: &str = "/passkey/verify-registration";

/// Provider live-session endpoint.
pub const SESSION_ENDPOINT: &str = "/get-session";

/// Feature-flag endpoint.
pub const FEATURES_ENDPOINT: &str = "/features";

// ═══════════════════════════════════════════════════════════════════════
// Ceremony wire shapes
// ═══════════════════════════════════════════════════════════════════════

/// A credential descriptor in server-issued options.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialDescriptor {
    id: String,
}

/// Authentication options issued by the server (challenge and friends,
/// URL-safe text encoded).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticationOptions {
    challenge: String,
    #[serde(default)]
    rp_id: Option<String>,
    #[serde(default)]
    allow_credentials: Option<Vec<CredentialDescriptor>>,
    #[serde(default)]
    timeout: Option<u32>,
    #[serde(default)]
    user_verification: Option<String>,
    /// Challenge-correlation id echoed back on verification.
    #[serde(default)]
    challenge_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelyingParty {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationUser {
    /// URL-safe text encoded user id.
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

/// Registration options issued by the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationOptions {
    challenge: String,
    #[serde(default)]
    rp: Option<RelyingParty>,
    user: RegistrationUser,
    #[serde(default)]
    exclude_credentials: Option<Vec<CredentialDescriptor>>,
    #[serde(default)]
    timeout: Option<u32>,
    #[serde(default)]
    attestation: Option<String>,
    #[serde(default)]
    challenge_id: Option<String>,
}

/// Verification response body for both ceremonies.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationResponse {
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    token: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// Loading guard
// ═══════════════════════════════════════════════════════════════════════

/// Clears the loading flag on drop, whatever the outcome.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Orchestrator
// ═══════════════════════════════════════════════════════════════════════

/// Session and passkey orchestrator.
///
/// The persistent store is the single source of truth for mode and user;
/// the accessors here read through to it, so every instance sharing a
/// jar observes the same session.
pub struct SessionManager<P, T, J, C> {
    context: Arc<AuthContext<P>>,
    fetch: AuthFetch<T, J>,
    credentials: C,
    loading: AtomicBool,
}

impl<P, T, J, C> SessionManager<P, T, J, C>
where
    P: AuthProvider,
    T: HttpTransport,
    J: CookieJar,
    C: CredentialSource,
{
    /// Create an orchestrator over a context, fetch protocol and
    /// platform credential source.
    #[must_use]
    pub const fn new(
        context: Arc<AuthContext<P>>,
        fetch: AuthFetch<T, J>,
        credentials: C,
    ) -> Self {
        Self {
            context,
            fetch,
            credentials,
            loading: AtomicBool::new(false),
        }
    }

    /// The persistent store backing this session.
    #[must_use]
    pub const fn store(&self) -> &AuthStateStore<J> {
        self.fetch.store()
    }

    /// Current persisted state snapshot.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.store().snapshot()
    }

    /// Current user, if authenticated.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state().user
    }

    /// Active auth mode.
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.store().mode()
    }

    /// Whether the fallback token transport is active.
    #[must_use]
    pub fn is_jwt_mode(&self) -> bool {
        self.mode() == AuthMode::Jwt
    }

    /// Whether the session is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.store().is_authenticated()
    }

    /// The persisted bearer token, if any.
    #[must_use]
    pub fn jwt_token(&self) -> Option<String> {
        self.store().token()
    }

    /// Whether an operation is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Atomically replace the persisted record — both mode and user,
    /// never a partial merge.
    pub fn set_user(&self, user: Option<User>, mode: AuthMode) {
        self.store().set_user(user, mode);
    }

    /// Reset to the logged-out default: default record, token cleared,
    /// known provider session cookies cleared.
    pub fn clear_user(&self) {
        self.store().clear();
    }

    /// Explicitly switch to jwt fallback mode. Returns success; never
    /// errors.
    pub async fn switch_to_jwt_mode(&self) -> bool {
        self.fetch.switch_to_jwt_mode().await
    }

    /// Re-issue the bearer token.
    ///
    /// Returns `false` unless already in jwt mode with a token in hand;
    /// in that case delegates to the mode switch (which refreshes the
    /// persisted token).
    pub async fn refresh_jwt_token(&self) -> bool {
        if self.is_jwt_mode() && self.jwt_token().is_some() {
            self.fetch.switch_to_jwt_mode().await
        } else {
            false
        }
    }

    /// Issue a request through the authenticated fetch protocol
    /// ([`crate::fetch`]): mode-appropriate credentials, cookie-bound
    /// path exemptions, single transparent retry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Transport`] when the network call fails.
    pub async fn fetch_with_auth(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.fetch.fetch(request).await
    }

    /// Reconcile local state against the provider's live session.
    ///
    /// Adopts a reported session (cookie mode) and pre-fetches the
    /// fallback token. When the provider reports no session but local
    /// state already has a user — e.g. set immediately after a 2FA step,
    /// before the provider's session read reflects it — local state is
    /// trusted rather than forcing a logout: a just-completed login must
    /// not be undone by a slightly-stale session read.
    pub async fn validate_session(&self) -> bool {
        let client = match self.context.client() {
            Ok(client) => client,
            Err(error) => {
                warn!(%error, "cannot validate session without a client");
                return false;
            }
        };

        match client.get_session().await {
            Ok(ProviderSession { user: Some(user), .. }) => {
                self.set_user(Some(user), AuthMode::Cookie);
                if self.jwt_token().is_none() {
                    let _ = self.fetch.prefetch_fallback_token().await;
                }
                true
            }
            Ok(ProviderSession { user: None, .. }) => {
                if self.is_authenticated() {
                    debug!("provider session read is stale, trusting local state");
                    true
                } else {
                    false
                }
            }
            Err(error) => {
                debug!(%error, "session validation failed");
                self.is_authenticated()
            }
        }
    }

    /// Sign in by email and password.
    ///
    /// The password is digested by the client before transmission. Mode
    /// adoption follows the response shape: a token present means the
    /// provider is not using cookies for this flow (adopt jwt directly);
    /// user data without a token means a cookie session, and a fallback
    /// token is pre-fetched proactively. When the provider signals a
    /// two-factor challenge instead
    /// ([`SignInResult::two_factor_redirect`]), no state is adopted —
    /// callers route to the verification step and local state stays
    /// logged out until it completes.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection, a transport failure, or a
    /// fatal construction failure.
    pub async fn sign_in_email(&self, email: &str, password: &str) -> Result<SignInResult> {
        let _guard = LoadingGuard::start(&self.loading);
        let client = self.context.client()?;
        let result = client.sign_in_email(email, password).await?;
        self.adopt_credential_result(&result).await;
        Ok(result)
    }

    /// Create an account by email and password.
    ///
    /// Same mode-adoption contract as [`SessionManager::sign_in_email`].
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection, a transport failure, or a
    /// fatal construction failure.
    pub async fn sign_up_email(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignInResult> {
        let _guard = LoadingGuard::start(&self.loading);
        let client = self.context.client()?;
        let result = client.sign_up_email(email, password, name).await?;
        self.adopt_credential_result(&result).await;
        Ok(result)
    }

    /// Sign out.
    ///
    /// Local state is cleared unconditionally, even when the remote call
    /// fails — the session must never remain stuck logged-in because of
    /// a network blip. This is the one deliberate exception to normal
    /// error propagation.
    pub async fn sign_out(&self) {
        let _guard = LoadingGuard::start(&self.loading);
        match self.context.client() {
            Ok(client) => {
                if let Err(error) = client.sign_out().await {
                    warn!(%error, "remote sign-out failed, clearing local session anyway");
                }
            }
            Err(error) => warn!(%error, "no client for sign-out, clearing local session"),
        }
        self.clear_user();
    }

    /// WebAuthn authentication ceremony.
    ///
    /// Fetches options, decodes the challenge, runs the platform
    /// retrieval ceremony, posts the encoded assertion for verification,
    /// and adopts the resulting session: user data means cookie mode; a
    /// bare session token means jwt mode plus a supplementary session
    /// fetch to recover user data (failure tolerated — the caller may
    /// re-validate later).
    ///
    /// # Errors
    ///
    /// [`AuthError::CeremonyAborted`] when the user declined or no
    /// credential was available — a distinct outcome, not a generic
    /// failure. [`AuthError::VerificationRejected`] carries the server's
    /// message when it refuses the assertion.
    pub async fn authenticate_with_passkey(&self) -> Result<Option<User>> {
        let _guard = LoadingGuard::start(&self.loading);

        let options: AuthenticationOptions = self
            .ceremony_get(PASSKEY_AUTH_OPTIONS_ENDPOINT)
            .await?;

        let request_options = CredentialRequestOptions {
            challenge: codec::decode(&options.challenge)?,
            rp_id: options.rp_id.clone(),
            allowed_credentials: Self::decode_descriptors(options.allow_credentials.as_deref())?,
            timeout_ms: options.timeout,
            user_verification: options.user_verification.clone(),
        };

        let assertion = self.credentials.get(request_options).await?;

        let payload = json!({
            "id": codec::encode(&assertion.raw_id),
            "rawId": codec::encode(&assertion.raw_id),
            "type": "public-key",
            "response": {
                "authenticatorData": codec::encode(&assertion.authenticator_data),
                "clientDataJSON": codec::encode(&assertion.client_data_json),
                "signature": codec::encode(&assertion.signature),
                "userHandle": assertion.user_handle.as_deref().map(codec::encode),
            },
            "challengeId": options.challenge_id,
        });

        let verification: VerificationResponse = self
            .ceremony_post(PASSKEY_AUTH_VERIFY_ENDPOINT, payload)
            .await?;

        if verification.user.is_some() {
            self.set_user(verification.user.clone(), AuthMode::Cookie);
            return Ok(verification.user);
        }

        if let Some(token) = verification.token.filter(|t| !t.is_empty()) {
            self.store().set_token(Some(&token));
            self.store().set_mode(AuthMode::Jwt);
            let user = self.recover_session_user().await;
            if user.is_some() {
                self.set_user(user.clone(), AuthMode::Jwt);
            }
            return Ok(user);
        }

        Err(AuthError::InvalidPayload(
            "verification response carried neither user nor token".to_string(),
        ))
    }

    /// WebAuthn registration ceremony.
    ///
    /// Mirrors authentication with the creation API: additionally
    /// decodes the user id from URL-safe text before the platform call
    /// and encodes the attestation object and transports on the way
    /// back.
    ///
    /// # Errors
    ///
    /// Three distinct failure categories: [`AuthError::CeremonyAborted`]
    /// (user cancelled), [`AuthError::DuplicateCredential`] (this
    /// authenticator already holds a passkey for the account), and
    /// [`AuthError::VerificationRejected`] /
    /// [`AuthError::CeremonyFailed`] for everything else.
    pub async fn register_passkey(&self, name: Option<&str>) -> Result<()> {
        let _guard = LoadingGuard::start(&self.loading);

        let options: RegistrationOptions = self
            .ceremony_get(PASSKEY_REGISTER_OPTIONS_ENDPOINT)
            .await?;

        let rp = options.rp.clone().unwrap_or(RelyingParty {
            id: None,
            name: None,
        });
        let creation_options = CredentialCreationOptions {
            challenge: codec::decode(&options.challenge)?,
            rp_id: rp.id,
            rp_name: rp.name,
            user_id: codec::decode(&options.user.id)?,
            user_name: options.user.name.clone().unwrap_or_default(),
            user_display_name: options.user.display_name.clone().unwrap_or_default(),
            exclude_credentials: Self::decode_descriptors(options.exclude_credentials.as_deref())?,
            timeout_ms: options.timeout,
            attestation: options.attestation.clone(),
        };

        let credential = self.credentials.create(creation_options).await?;

        let payload = json!({
            "id": codec::encode(&credential.raw_id),
            "rawId": codec::encode(&credential.raw_id),
            "type": "public-key",
            "response": {
                "clientDataJSON": codec::encode(&credential.client_data_json),
                "attestationObject": codec::encode(&credential.attestation_object),
                "transports": credential.transports,
            },
            "name": name,
            "challengeId": options.challenge_id,
        });

        let _: serde_json::Value = self
            .ceremony_post(PASSKEY_REGISTER_VERIFY_ENDPOINT, payload)
            .await?;
        debug!("passkey registered");
        Ok(())
    }

    /// Fetch the feature-flag map, once per session.
    ///
    /// The first successful fetch is cached in the context and shared
    /// across all orchestrator instances. Failure returns the last-known
    /// (possibly empty) map without raising.
    pub async fn fetch_features(&self) -> HashMap<String, bool> {
        if let Some(cached) = self.context.cached_features() {
            return cached;
        }

        let request = HttpRequest::get(self.fetch.url(FEATURES_ENDPOINT));
        match self.fetch.fetch(request).await {
            Ok(response) if response.ok() => match response.json::<HashMap<String, bool>>() {
                Ok(features) => {
                    self.context.cache_features(features.clone());
                    features
                }
                Err(error) => {
                    debug!(%error, "feature response malformed");
                    HashMap::new()
                }
            },
            Ok(response) => {
                debug!(status = response.status, "feature fetch refused");
                HashMap::new()
            }
            Err(error) => {
                debug!(%error, "feature fetch failed");
                HashMap::new()
            }
        }
    }

    /// Whether a cached feature flag is enabled. `false` when the map
    /// has not been fetched or the flag is absent.
    #[must_use]
    pub fn feature_enabled(&self, name: &str) -> bool {
        self.context
            .cached_features()
            .is_some_and(|features| features.get(name).copied().unwrap_or(false))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════

    async fn ceremony_get<D: serde::de::DeserializeOwned>(&self, path: &str) -> Result<D> {
        let request = HttpRequest::get(self.fetch.url(path));
        let response = self.fetch.fetch(request).await?;
        Self::require_ok(&response)?;
        response.json()
    }

    async fn ceremony_post<D: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<D> {
        let request = HttpRequest::post(self.fetch.url(path), payload);
        let response = self.fetch.fetch(request).await?;
        Self::require_ok(&response)?;
        response.json()
    }

    fn require_ok(response: &HttpResponse) -> Result<()> {
        if response.ok() {
            Ok(())
        } else {
            Err(AuthError::VerificationRejected {
                message: response
                    .error_message()
                    .unwrap_or_else(|| "Something went wrong, please try again".to_string()),
            })
        }
    }

    fn decode_descriptors(descriptors: Option<&[CredentialDescriptor]>) -> Result<Vec<Vec<u8>>> {
        descriptors
            .unwrap_or_default()
            .iter()
            .map(|descriptor| codec::decode(&descriptor.id))
            .collect()
    }

    async fn adopt_credential_result(&self, result: &SignInResult) {
        if result.two_factor_redirect {
            // The flow is parked at the two-factor step; there is no
            // session to adopt until verification completes.
            debug!("two-factor challenge pending, deferring session adoption");
            return;
        }
        if let Some(token) = result.token.as_deref().filter(|t| !t.is_empty()) {
            // Provider indicated cookies are not in use for this flow.
            self.store().set_token(Some(token));
            self.set_user(result.user.clone(), AuthMode::Jwt);
        } else if result.user.is_some() {
            self.set_user(result.user.clone(), AuthMode::Cookie);
            let _ = self.fetch.prefetch_fallback_token().await;
        }
    }

    async fn recover_session_user(&self) -> Option<User> {
        let request = HttpRequest::get(self.fetch.url(SESSION_ENDPOINT));
        match self.fetch.fetch(request).await {
            Ok(response) if response.ok() => response
                .json::<ProviderSession>()
                .ok()
                .and_then(|session| session.user),
            Ok(_) | Err(_) => {
                debug!("supplementary session fetch failed after token-only verification");
                None
            }
        }
    }
}
