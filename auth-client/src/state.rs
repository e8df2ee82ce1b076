//! Authentication state types.
//!
//! These are the types persisted to the durable record store and held
//! as the reactive session snapshot. All types are `Clone`; the `User`
//! snapshot is always replaced wholesale, never mutated in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which transport currently carries authentication.
///
/// `Cookie` is the primary mode; `Jwt` is the fallback adopted when an
/// apparently-valid cookie session starts answering 401. Once the
/// session downgrades to `Jwt` it stays there until the next login.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// HttpOnly cookie session (primary).
    #[default]
    Cookie,

    /// Bearer token fallback.
    Jwt,
}

impl AuthMode {
    /// Get the mode name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
            Self::Jwt => "jwt",
        }
    }

    /// Parse a mode from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a recognized mode.
    pub fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "cookie" => Ok(Self::Cookie),
            "jwt" => Ok(Self::Jwt),
            _ => Err(format!("Unknown auth mode: {s}")),
        }
    }
}

/// User snapshot owned by the persisted auth record.
///
/// Field names follow the provider's camelCase JSON on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Provider-issued user ID.
    pub id: String,

    /// Email address.
    pub email: String,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Avatar URL.
    #[serde(default)]
    pub image: Option<String>,

    /// Role name (e.g., "admin").
    #[serde(default)]
    pub role: Option<String>,

    /// Email verified flag.
    #[serde(default)]
    pub email_verified: Option<bool>,

    /// Whether TOTP two-factor is enabled.
    #[serde(default)]
    pub two_factor_enabled: Option<bool>,

    /// Whether the account is banned.
    #[serde(default)]
    pub banned: Option<bool>,

    /// Ban expiry, if banned.
    #[serde(default)]
    pub ban_expires: Option<DateTime<Utc>>,

    /// Ban reason, if banned.
    #[serde(default)]
    pub ban_reason: Option<String>,
}

impl User {
    /// Build a minimal user snapshot with just id and email.
    #[must_use]
    pub const fn new(id: String, email: String) -> Self {
        Self {
            id,
            email,
            name: None,
            image: None,
            role: None,
            email_verified: None,
            two_factor_enabled: None,
            banned: None,
            ban_expires: None,
            ban_reason: None,
        }
    }
}

/// The persisted auth record: active mode plus the user snapshot.
///
/// `user == None` means the session is logically logged out regardless
/// of what `auth_mode` says.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    /// Active transport mode.
    #[serde(default)]
    pub auth_mode: AuthMode,

    /// Current user, or `None` when logged out.
    #[serde(default)]
    pub user: Option<User>,
}

impl AuthState {
    /// Whether this state represents an authenticated session.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_auth_mode_str_round_trip() {
        assert_eq!(AuthMode::Cookie.as_str(), "cookie");
        assert_eq!(AuthMode::Jwt.as_str(), "jwt");
        assert_eq!(AuthMode::from_str("jwt"), Ok(AuthMode::Jwt));
        assert!(AuthMode::from_str("bearer").is_err());
    }

    #[test]
    fn test_default_state_is_logged_out_cookie_mode() {
        let state = AuthState::default();
        assert_eq!(state.auth_mode, AuthMode::Cookie);
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_record_serializes_with_camel_case_mode() {
        let state = AuthState {
            auth_mode: AuthMode::Jwt,
            user: Some(User::new("u1".to_string(), "user@example.com".to_string())),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"authMode\":\"jwt\""));

        let parsed: AuthState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_record_tolerates_missing_fields() {
        let parsed: AuthState = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, AuthState::default());
    }
}
