//! Error types for the client-side authentication state manager.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for the dual-mode authentication client.
///
/// Variants are organized by category. Transport failures are swallowed
/// at the store layer and surfaced as `false`/`None` by the orchestrator;
/// ceremony outcomes are distinct, user-facing conditions that must never
/// be conflated with generic failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Transport Errors
    // ═══════════════════════════════════════════════════════════

    /// Network or transport failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered 401 and no fallback applied.
    #[error("Unauthorized")]
    Unauthorized,

    // ═══════════════════════════════════════════════════════════
    // WebAuthn Ceremony Outcomes
    // ═══════════════════════════════════════════════════════════

    /// The user declined the platform credential prompt, or no
    /// credential was available.
    #[error("Passkey ceremony was cancelled")]
    CeremonyAborted,

    /// A passkey for this account already exists on this authenticator.
    #[error("A passkey already exists on this authenticator")]
    DuplicateCredential,

    /// The platform credential API failed for another reason.
    #[error("Passkey ceremony failed: {0}")]
    CeremonyFailed(String),

    /// The server rejected the verification round-trip.
    #[error("Verification rejected: {message}")]
    VerificationRejected {
        /// Server-provided message, or a generic fallback.
        message: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Payload Errors
    // ═══════════════════════════════════════════════════════════

    /// A wire payload or durable record could not be decoded.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // ═══════════════════════════════════════════════════════════
    // Construction Errors
    // ═══════════════════════════════════════════════════════════

    /// The underlying provider client could not be constructed.
    ///
    /// Fatal: no authentication is possible without a client.
    #[error("Auth client construction failed: {0}")]
    ClientConstruction(String),
}

impl AuthError {
    /// Returns `true` if this error is a recognized WebAuthn ceremony
    /// outcome rather than a system failure.
    ///
    /// # Examples
    ///
    /// ```
    /// # use auth_client::error::AuthError;
    /// assert!(AuthError::CeremonyAborted.is_ceremony_outcome());
    /// assert!(!AuthError::Unauthorized.is_ceremony_outcome());
    /// ```
    #[must_use]
    pub const fn is_ceremony_outcome(&self) -> bool {
        matches!(
            self,
            Self::CeremonyAborted | Self::DuplicateCredential | Self::CeremonyFailed(_)
        )
    }

    /// Returns `true` if this error is fatal for the application.
    ///
    /// Only construction-time failures are fatal; everything else is a
    /// recoverable condition the UI can present.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ClientConstruction(_))
    }

    /// A stable, user-presentable message for this error.
    ///
    /// Server-provided messages are surfaced verbatim; everything else
    /// maps to a generic fallback suitable for localization lookup.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::CeremonyAborted => "Passkey sign-in was cancelled".to_string(),
            Self::DuplicateCredential => {
                "A passkey already exists on this device. Remove it first or use a different authenticator".to_string()
            }
            Self::VerificationRejected { message } => message.clone(),
            Self::Transport(_) | Self::Unauthorized => {
                "Something went wrong, please try again".to_string()
            }
            other => other.to_string(),
        }
    }
}
