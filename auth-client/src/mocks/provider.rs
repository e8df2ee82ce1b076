//! Mock auth-provider SDK adapter.

use crate::error::Result;
use crate::providers::{AuthProvider, ProviderSession, SignInResult};
use std::sync::{Arc, Mutex, PoisonError};

/// A recorded provider call: method name plus the argument values as
/// they arrived on the wire side of the adapter.
pub type RecordedCall = (String, Vec<String>);

#[derive(Debug)]
struct ProviderState {
    sign_in: Mutex<Result<SignInResult>>,
    sign_up: Mutex<Result<SignInResult>>,
    sign_out: Mutex<Result<()>>,
    verify: Mutex<Result<SignInResult>>,
    session: Mutex<Result<ProviderSession>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            sign_in: Mutex::new(Ok(SignInResult::default())),
            sign_up: Mutex::new(Ok(SignInResult::default())),
            sign_out: Mutex::new(Ok(())),
            verify: Mutex::new(Ok(SignInResult::default())),
            session: Mutex::new(Ok(ProviderSession::default())),
            calls: Mutex::new(Vec::new()),
        }
    }
}

/// Mock [`AuthProvider`] with scripted results and full call recording.
///
/// The recorded arguments include the password digests exactly as the
/// client wrapper transmitted them, so tests can assert that plaintext
/// passwords never reach the provider.
#[derive(Debug, Clone, Default)]
pub struct MockAuthProvider {
    state: Arc<ProviderState>,
}

impl MockAuthProvider {
    /// Provider answering every call with empty success.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the sign-in result.
    pub fn set_sign_in_result(&self, result: Result<SignInResult>) {
        *self
            .state
            .sign_in
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = result;
    }

    /// Script the sign-up result.
    pub fn set_sign_up_result(&self, result: Result<SignInResult>) {
        *self
            .state
            .sign_up
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = result;
    }

    /// Script the sign-out result.
    pub fn set_sign_out_result(&self, result: Result<()>) {
        *self
            .state
            .sign_out
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = result;
    }

    /// Script the 2FA verification result.
    pub fn set_verify_result(&self, result: Result<SignInResult>) {
        *self
            .state
            .verify
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = result;
    }

    /// Script the live-session query result.
    pub fn set_session(&self, result: Result<ProviderSession>) {
        *self
            .state
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = result;
    }

    /// All calls seen so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every argument value recorded across all calls.
    #[must_use]
    pub fn all_arguments(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .flat_map(|(_, arguments)| arguments)
            .collect()
    }

    fn record(&self, method: &str, arguments: &[&str]) {
        self.state
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((
                method.to_string(),
                arguments.iter().map(ToString::to_string).collect(),
            ));
    }

    fn scripted<V: Clone>(slot: &Mutex<Result<V>>) -> Result<V> {
        slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl AuthProvider for MockAuthProvider {
    async fn sign_in_email(&self, email: &str, password_digest: &str) -> Result<SignInResult> {
        self.record("sign_in_email", &[email, password_digest]);
        Self::scripted(&self.state.sign_in)
    }

    async fn sign_up_email(
        &self,
        email: &str,
        password_digest: &str,
        name: &str,
    ) -> Result<SignInResult> {
        self.record("sign_up_email", &[email, password_digest, name]);
        Self::scripted(&self.state.sign_up)
    }

    async fn sign_out(&self) -> Result<()> {
        self.record("sign_out", &[]);
        Self::scripted(&self.state.sign_out)
    }

    async fn change_password(&self, current_digest: &str, new_digest: &str) -> Result<()> {
        self.record("change_password", &[current_digest, new_digest]);
        Ok(())
    }

    async fn reset_password(&self, new_digest: &str, token: &str) -> Result<()> {
        self.record("reset_password", &[new_digest, token]);
        Ok(())
    }

    async fn two_factor_enable(&self, password_digest: &str) -> Result<()> {
        self.record("two_factor_enable", &[password_digest]);
        Ok(())
    }

    async fn two_factor_disable(&self, password_digest: &str) -> Result<()> {
        self.record("two_factor_disable", &[password_digest]);
        Ok(())
    }

    async fn two_factor_generate_backup_codes(
        &self,
        password_digest: &str,
    ) -> Result<Vec<String>> {
        self.record("two_factor_generate_backup_codes", &[password_digest]);
        Ok(vec!["backup-1".to_string(), "backup-2".to_string()])
    }

    async fn two_factor_verify_totp(&self, code: &str) -> Result<SignInResult> {
        self.record("two_factor_verify_totp", &[code]);
        Self::scripted(&self.state.verify)
    }

    async fn two_factor_verify_backup_code(&self, code: &str) -> Result<SignInResult> {
        self.record("two_factor_verify_backup_code", &[code]);
        Self::scripted(&self.state.verify)
    }

    async fn get_session(&self) -> Result<ProviderSession> {
        self.record("get_session", &[]);
        Self::scripted(&self.state.session)
    }
}
