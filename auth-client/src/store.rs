//! Persistent auth state store.
//!
//! Reads and writes the two durable records — the auth-mode + user
//! snapshot and the bearer token — through a [`CookieJar`]. The store
//! never errors: an absent, malformed or unreadable record is treated as
//! "no state" and logged at debug level.
//!
//! Mode and token are set together but read independently. A token may
//! exist while the mode is still [`AuthMode::Cookie`]; it is a
//! pre-fetched fallback-in-waiting, and its presence alone never implies
//! jwt mode.

use crate::providers::{CookieAttributes, CookieJar};
use crate::state::{AuthMode, AuthState, User};
use std::sync::Arc;
use tracing::debug;

/// Record name for the serialized [`AuthState`].
pub const AUTH_STATE_COOKIE: &str = "auth_state";

/// Record name for the bearer token.
pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// Validity window for both records: 7 days.
pub const AUTH_RECORD_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// Provider session-cookie names cleared defensively on logout. The
/// exact name the provider uses is not knowable from this layer.
const PROVIDER_SESSION_COOKIES: [&str; 3] = [
    "session_token",
    "auth.session_token",
    "__Secure-auth.session_token",
];

/// Path scopes the provider may have written its session cookie under.
const PROVIDER_COOKIE_PATHS: [&str; 3] = ["/", "/api", "/api/auth"];

/// Persistent auth state store over a [`CookieJar`].
///
/// Cheap to clone; clones share the same jar.
#[derive(Debug)]
pub struct AuthStateStore<J> {
    jar: Arc<J>,
}

impl<J> Clone for AuthStateStore<J> {
    fn clone(&self) -> Self {
        Self {
            jar: Arc::clone(&self.jar),
        }
    }
}

impl<J: CookieJar> AuthStateStore<J> {
    /// Create a store over the given jar.
    #[must_use]
    pub const fn new(jar: Arc<J>) -> Self {
        Self { jar }
    }

    /// The underlying jar.
    #[must_use]
    pub fn jar(&self) -> &Arc<J> {
        &self.jar
    }

    /// Current persisted state, or the default when absent/malformed.
    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        let Some(raw) = self.jar.get(AUTH_STATE_COOKIE) else {
            return AuthState::default();
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(error) => {
                debug!(%error, "auth state record is malformed, treating as no state");
                AuthState::default()
            }
        }
    }

    /// Active auth mode. [`AuthMode::Cookie`] when no record exists.
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.snapshot().auth_mode
    }

    /// Whether a non-null user snapshot is persisted.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated()
    }

    /// Read the bearer token.
    ///
    /// Tolerates both raw-string and JSON-string-quoted encodings
    /// (records written by older variants were double-encoded). Returns
    /// `None` on any failure or an empty value.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        let raw = self.jar.get(AUTH_TOKEN_COOKIE)?;
        let token = if raw.starts_with('"') {
            match serde_json::from_str::<String>(&raw) {
                Ok(token) => token,
                Err(error) => {
                    debug!(%error, "token record is malformed, treating as no token");
                    return None;
                }
            }
        } else {
            raw
        };
        if token.is_empty() { None } else { Some(token) }
    }

    /// Write or clear the bearer token.
    pub fn set_token(&self, token: Option<&str>) {
        match token {
            Some(token) => self.jar.set(
                AUTH_TOKEN_COOKIE,
                token,
                &CookieAttributes::window(AUTH_RECORD_MAX_AGE_SECS),
            ),
            None => self.jar.set(AUTH_TOKEN_COOKIE, "", &CookieAttributes::expired()),
        }
    }

    /// Merge a new mode into the persisted record, preserving the user
    /// snapshot. Starts from the default record when none exists.
    pub fn set_mode(&self, mode: AuthMode) {
        let mut state = self.snapshot();
        state.auth_mode = mode;
        self.write_state(&state);
    }

    /// Replace the persisted record wholesale — never a partial merge.
    pub fn set_user(&self, user: Option<User>, mode: AuthMode) {
        self.write_state(&AuthState {
            auth_mode: mode,
            user,
        });
    }

    /// Reset to the logged-out default, clear the bearer token, and
    /// defensively clear known provider session cookies across path
    /// scopes.
    pub fn clear(&self) {
        self.set_user(None, AuthMode::Cookie);
        self.set_token(None);
        for name in PROVIDER_SESSION_COOKIES {
            for path in PROVIDER_COOKIE_PATHS {
                self.jar.remove(name, path);
            }
        }
        debug!("auth state cleared");
    }

    fn write_state(&self, state: &AuthState) {
        match serde_json::to_string(state) {
            Ok(serialized) => self.jar.set(
                AUTH_STATE_COOKIE,
                &serialized,
                &CookieAttributes::window(AUTH_RECORD_MAX_AGE_SECS),
            ),
            Err(error) => debug!(%error, "failed to serialize auth state record"),
        }
    }
}
