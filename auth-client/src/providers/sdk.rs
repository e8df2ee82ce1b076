//! External auth-provider SDK adapter trait.
//!
//! An explicit interface exposing only the provider operations this
//! system actually calls, decoupling the state machine from the SDK's
//! full surface.
//!
//! Every `*_digest` parameter receives the one-way digest produced by
//! [`crate::codec::digest`], never a plaintext password — hashing happens
//! in [`crate::client::AuthClient`] before any call reaches an
//! implementation of this trait.

use crate::error::Result;
use crate::state::User;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Result of a credential-submitting provider call.
///
/// The response shape drives mode adoption: a token present means the
/// provider is not using cookies for this flow (adopt jwt); user data
/// without a token means a cookie session was established.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResult {
    /// User snapshot, when the flow completed.
    #[serde(default)]
    pub user: Option<User>,

    /// Bearer token, when the provider issued one directly.
    #[serde(default)]
    pub token: Option<String>,

    /// The provider signalled a two-factor challenge; the configured
    /// redirect side effect has been invoked.
    #[serde(default)]
    pub two_factor_redirect: bool,
}

/// The provider's live session query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSession {
    /// User attached to the active session, if any.
    #[serde(default)]
    pub user: Option<User>,

    /// Session token, when the provider exposes one.
    #[serde(default)]
    pub token: Option<String>,
}

/// External auth-provider SDK.
///
/// Implementations are constructed by the client factory with the
/// authenticated-fetch protocol installed as their transport and the
/// resolved plugin list applied.
pub trait AuthProvider: Send + Sync {
    /// Sign in with email + password digest.
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection or a transport failure.
    fn sign_in_email(
        &self,
        email: &str,
        password_digest: &str,
    ) -> impl Future<Output = Result<SignInResult>> + Send;

    /// Create an account with email + password digest.
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection or a transport failure.
    fn sign_up_email(
        &self,
        email: &str,
        password_digest: &str,
        name: &str,
    ) -> impl Future<Output = Result<SignInResult>> + Send;

    /// End the provider session.
    ///
    /// # Errors
    ///
    /// Returns a transport failure; callers clear local state anyway.
    fn sign_out(&self) -> impl Future<Output = Result<()>> + Send;

    /// Change the account password (both arguments are digests).
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection or a transport failure.
    fn change_password(
        &self,
        current_digest: &str,
        new_digest: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Complete a password reset with a reset token.
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection or a transport failure.
    fn reset_password(
        &self,
        new_digest: &str,
        token: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Enable TOTP two-factor (password digest confirms identity).
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection or a transport failure.
    fn two_factor_enable(&self, password_digest: &str) -> impl Future<Output = Result<()>> + Send;

    /// Disable TOTP two-factor.
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection or a transport failure.
    fn two_factor_disable(&self, password_digest: &str) -> impl Future<Output = Result<()>> + Send;

    /// Generate fresh backup codes.
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection or a transport failure.
    fn two_factor_generate_backup_codes(
        &self,
        password_digest: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Verify a TOTP code. Verifies a secret rather than transmitting
    /// one; passes through unhashed.
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection or a transport failure.
    fn two_factor_verify_totp(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<SignInResult>> + Send;

    /// Verify a backup code. Passes through unhashed.
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection or a transport failure.
    fn two_factor_verify_backup_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<SignInResult>> + Send;

    /// Query the provider's current session.
    ///
    /// # Errors
    ///
    /// Returns a transport failure; an anonymous session is `Ok` with
    /// `user: None`.
    fn get_session(&self) -> impl Future<Output = Result<ProviderSession>> + Send;
}
