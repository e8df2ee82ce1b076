//! Authenticated fetch protocol.
//!
//! Wraps outbound HTTP calls with the credentials appropriate to the
//! active mode, detects authorization failure on an apparently-valid
//! cookie session, and performs a single transparent mode-switch-and-
//! retry. The protocol never retries the token endpoint, never retries
//! more than once, and works on its own copy of the request — the
//! caller's request is never mutated.
//!
//! Mode state machine: `cookie --[401 on authenticated request, switch
//! succeeds]--> jwt`. There is no automatic jwt→cookie transition; only
//! logout resets to cookie mode.

use crate::providers::{
    CookieJar, CredentialsMode, HttpRequest, HttpResponse, HttpTransport, path_has_prefix,
};
use crate::state::AuthMode;
use crate::store::AuthStateStore;
use crate::error::Result;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Token-issuance endpoint, relative to the API base.
pub const TOKEN_ENDPOINT: &str = "/token";

/// Path prefixes whose ceremonies depend on server-side challenge state
/// bound to the cookie session; these always receive ambient
/// credentials, even for callers that asked for an anonymous call in
/// jwt mode.
const COOKIE_BOUND_PREFIXES: [&str; 2] = ["/passkey", "/two-factor"];

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Authenticated fetch over a transport and the persistent store.
#[derive(Debug)]
pub struct AuthFetch<T, J> {
    transport: Arc<T>,
    store: AuthStateStore<J>,
    api_base: String,
}

impl<T, J> Clone for AuthFetch<T, J> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            store: self.store.clone(),
            api_base: self.api_base.clone(),
        }
    }
}

impl<T: HttpTransport, J: CookieJar> AuthFetch<T, J> {
    /// Create the protocol over a transport, store and resolved API
    /// base (see [`crate::config::ClientConfig::api_base`]).
    #[must_use]
    pub const fn new(transport: Arc<T>, store: AuthStateStore<J>, api_base: String) -> Self {
        Self {
            transport,
            store,
            api_base,
        }
    }

    /// The resolved API base every endpoint URL is built from.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// The store this protocol reads mode and token from.
    #[must_use]
    pub const fn store(&self) -> &AuthStateStore<J> {
        &self.store
    }

    /// Build a full endpoint URL from a path relative to the API base.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// Issue a request with mode-appropriate credentials and the
    /// single-retry fallback.
    ///
    /// 1. In jwt mode with a token on hand, a bearer header is attached.
    /// 2. Ambient session credentials are included unless the caller
    ///    explicitly opted out (and even then, cookie-bound ceremony
    ///    paths force them back on).
    /// 3. A 401 on a cookie-mode request of an authenticated session
    ///    triggers exactly one mode switch; on success the original
    ///    request is re-issued once with the new bearer header.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AuthError::Transport`] only when the
    /// network call itself fails; HTTP error statuses are returned in
    /// the response.
    pub async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mode = self.store.mode();
        let mut attempt = request;

        attempt.credentials = Self::resolve_credentials(&attempt);
        if mode == AuthMode::Jwt {
            if let Some(token) = self.store.token() {
                attempt.set_header("Authorization", format!("Bearer {token}"));
            }
        }

        let retry_basis = attempt.clone();
        let response = self.transport.send(attempt).await?;

        // Only an unexpected failure of an apparently-valid cookie
        // session triggers the fallback; anonymous 401s never do.
        if response.status == 401
            && mode == AuthMode::Cookie
            && self.store.is_authenticated()
            && self.switch_to_jwt_mode().await
        {
            let mut retry = retry_basis;
            if let Some(token) = self.store.token() {
                retry.set_header("Authorization", format!("Bearer {token}"));
            }
            return self.transport.send(retry).await;
        }

        Ok(response)
    }

    /// Attempt the cookie→jwt mode switch: call the token endpoint with
    /// ambient credentials and, on success, persist the token and
    /// `jwt` mode together.
    ///
    /// Never errors; any failure reports `false` and leaves state
    /// untouched.
    pub async fn switch_to_jwt_mode(&self) -> bool {
        match self.request_token().await {
            Some(token) => {
                self.store.set_token(Some(&token));
                self.store.set_mode(AuthMode::Jwt);
                debug!("switched to jwt fallback mode");
                true
            }
            None => false,
        }
    }

    /// Pre-fetch a fallback token without leaving cookie mode.
    ///
    /// Used proactively after a successful cookie-mode login so the
    /// fallback is already in hand if the cookie session later fails.
    /// The persisted mode stays `cookie`; token presence alone never
    /// implies jwt mode.
    pub async fn prefetch_fallback_token(&self) -> bool {
        match self.request_token().await {
            Some(token) => {
                self.store.set_token(Some(&token));
                debug!("fallback token pre-fetched");
                true
            }
            None => false,
        }
    }

    async fn request_token(&self) -> Option<String> {
        let request = HttpRequest::get(self.url(TOKEN_ENDPOINT))
            .with_credentials(CredentialsMode::Include);
        match self.transport.send(request).await {
            Ok(response) if response.ok() => match response.json::<TokenResponse>() {
                Ok(TokenResponse { token: Some(token) }) if !token.is_empty() => Some(token),
                _ => {
                    debug!("token endpoint answered without a token");
                    None
                }
            },
            Ok(response) => {
                debug!(status = response.status, "token endpoint refused");
                None
            }
            Err(error) => {
                warn!(%error, "token endpoint unreachable");
                None
            }
        }
    }

    fn resolve_credentials(request: &HttpRequest) -> CredentialsMode {
        match request.credentials {
            // Always-include policy: redundant in jwt mode but robust
            // against partial migration states.
            CredentialsMode::Default | CredentialsMode::Include => CredentialsMode::Include,
            CredentialsMode::Omit => {
                if Self::is_cookie_bound(request.path()) {
                    CredentialsMode::Include
                } else {
                    CredentialsMode::Omit
                }
            }
        }
    }

    fn is_cookie_bound(path: &str) -> bool {
        COOKIE_BOUND_PREFIXES
            .iter()
            .any(|prefix| path_has_prefix(path, prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Method;

    #[test]
    fn test_cookie_bound_paths_force_ambient_credentials() {
        let request = HttpRequest::get("/api/auth/passkey/generate-register-options")
            .with_credentials(CredentialsMode::Omit);
        assert_eq!(
            AuthFetch::<crate::mocks::MockTransport, crate::mocks::MockCookieJar>::resolve_credentials(&request),
            CredentialsMode::Include
        );

        let anonymous = HttpRequest::get("/api/public/features")
            .with_credentials(CredentialsMode::Omit);
        assert_eq!(
            AuthFetch::<crate::mocks::MockTransport, crate::mocks::MockCookieJar>::resolve_credentials(&anonymous),
            CredentialsMode::Omit
        );

        // Similar-looking segments do not count as cookie-bound.
        let lookalike = HttpRequest::get("/api/passkeys/list")
            .with_credentials(CredentialsMode::Omit);
        assert_eq!(
            AuthFetch::<crate::mocks::MockTransport, crate::mocks::MockCookieJar>::resolve_credentials(&lookalike),
            CredentialsMode::Omit
        );
    }

    #[test]
    fn test_default_credentials_resolve_to_include() {
        let request = HttpRequest {
            method: Method::Get,
            url: "/api/auth/get-session".to_string(),
            headers: Vec::new(),
            body: None,
            credentials: CredentialsMode::Default,
        };
        assert_eq!(
            AuthFetch::<crate::mocks::MockTransport, crate::mocks::MockCookieJar>::resolve_credentials(&request),
            CredentialsMode::Include
        );
    }
}
