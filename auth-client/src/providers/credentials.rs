//! WebAuthn platform credential API trait.
//!
//! Wraps `navigator.credentials.create()` / `.get()` or the native
//! platform equivalent. The trait operates on binary buffers; all
//! URL-safe text encoding happens in the orchestrator via
//! [`crate::codec`].

use std::future::Future;
use thiserror::Error;

/// Platform credential-ceremony failure.
///
/// The three categories callers must distinguish. Cancellation and
/// duplicate-credential are recognized outcomes, not generic errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CeremonyError {
    /// The user declined, or no usable credential exists.
    #[error("ceremony cancelled by user or no credential available")]
    Cancelled,

    /// The authenticator already holds a credential for this account
    /// (creation only; the platform `InvalidStateError` signal).
    #[error("credential already registered on this authenticator")]
    DuplicateCredential,

    /// Any other platform failure.
    #[error("platform credential API failed: {0}")]
    Failed(String),
}

impl From<CeremonyError> for crate::error::AuthError {
    fn from(error: CeremonyError) -> Self {
        match error {
            CeremonyError::Cancelled => Self::CeremonyAborted,
            CeremonyError::DuplicateCredential => Self::DuplicateCredential,
            CeremonyError::Failed(reason) => Self::CeremonyFailed(reason),
        }
    }
}

/// Options for a credential-retrieval (authentication) ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequestOptions {
    /// Decoded challenge bytes.
    pub challenge: Vec<u8>,

    /// Relying-party ID.
    pub rp_id: Option<String>,

    /// Decoded credential IDs the server will accept.
    pub allowed_credentials: Vec<Vec<u8>>,

    /// Ceremony timeout in milliseconds.
    pub timeout_ms: Option<u32>,

    /// User-verification requirement ("required", "preferred", ...).
    pub user_verification: Option<String>,
}

/// The assertion produced by a retrieval ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionCredential {
    /// Raw credential ID.
    pub raw_id: Vec<u8>,

    /// Authenticator data.
    pub authenticator_data: Vec<u8>,

    /// Client data JSON bytes.
    pub client_data_json: Vec<u8>,

    /// Assertion signature.
    pub signature: Vec<u8>,

    /// User handle, when the authenticator returned one.
    pub user_handle: Option<Vec<u8>>,
}

/// Options for a credential-creation (registration) ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialCreationOptions {
    /// Decoded challenge bytes.
    pub challenge: Vec<u8>,

    /// Relying-party ID.
    pub rp_id: Option<String>,

    /// Relying-party display name.
    pub rp_name: Option<String>,

    /// Decoded user ID bytes.
    pub user_id: Vec<u8>,

    /// User name (account identifier).
    pub user_name: String,

    /// User display name.
    pub user_display_name: String,

    /// Decoded credential IDs to exclude (already registered).
    pub exclude_credentials: Vec<Vec<u8>>,

    /// Ceremony timeout in milliseconds.
    pub timeout_ms: Option<u32>,

    /// Attestation conveyance preference.
    pub attestation: Option<String>,
}

/// The credential produced by a creation ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCredential {
    /// Raw credential ID.
    pub raw_id: Vec<u8>,

    /// Client data JSON bytes.
    pub client_data_json: Vec<u8>,

    /// Attestation object.
    pub attestation_object: Vec<u8>,

    /// Transports the authenticator reports ("internal", "usb", ...).
    pub transports: Vec<String>,
}

/// Platform credential API.
///
/// Ceremonies are inherently serialized by the platform (one per page),
/// so implementations need no additional coordination.
pub trait CredentialSource: Send + Sync {
    /// Run a retrieval (authentication) ceremony.
    ///
    /// # Errors
    ///
    /// Returns a [`CeremonyError`] with the platform's failure category.
    fn get(
        &self,
        options: CredentialRequestOptions,
    ) -> impl Future<Output = std::result::Result<AssertionCredential, CeremonyError>> + Send;

    /// Run a creation (registration) ceremony.
    ///
    /// # Errors
    ///
    /// Returns a [`CeremonyError`] with the platform's failure category;
    /// [`CeremonyError::DuplicateCredential`] only occurs here.
    fn create(
        &self,
        options: CredentialCreationOptions,
    ) -> impl Future<Output = std::result::Result<RegisteredCredential, CeremonyError>> + Send;
}
