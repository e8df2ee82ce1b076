//! Mock platform credential API.

use crate::providers::{
    AssertionCredential, CeremonyError, CredentialCreationOptions, CredentialRequestOptions,
    CredentialSource, RegisteredCredential,
};
use std::sync::{Arc, Mutex, PoisonError};

type GetOutcome = std::result::Result<AssertionCredential, CeremonyError>;
type CreateOutcome = std::result::Result<RegisteredCredential, CeremonyError>;

#[derive(Debug)]
struct CredentialState {
    get_outcome: Mutex<GetOutcome>,
    create_outcome: Mutex<CreateOutcome>,
    get_options: Mutex<Vec<CredentialRequestOptions>>,
    create_options: Mutex<Vec<CredentialCreationOptions>>,
}

/// Mock [`CredentialSource`] with configurable ceremony outcomes.
#[derive(Debug, Clone)]
pub struct MockCredentialSource {
    state: Arc<CredentialState>,
}

impl MockCredentialSource {
    /// Source answering both ceremonies with sample credentials.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(CredentialState {
                get_outcome: Mutex::new(Ok(Self::sample_assertion())),
                create_outcome: Mutex::new(Ok(Self::sample_registration())),
                get_options: Mutex::new(Vec::new()),
                create_options: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A plausible assertion credential for scripting.
    #[must_use]
    pub fn sample_assertion() -> AssertionCredential {
        AssertionCredential {
            raw_id: vec![1, 2, 3, 4],
            authenticator_data: vec![5, 6, 7, 8],
            client_data_json: br#"{"type":"webauthn.get"}"#.to_vec(),
            signature: vec![9, 10, 11, 12],
            user_handle: Some(vec![13, 14]),
        }
    }

    /// A plausible registered credential for scripting.
    #[must_use]
    pub fn sample_registration() -> RegisteredCredential {
        RegisteredCredential {
            raw_id: vec![1, 2, 3, 4],
            client_data_json: br#"{"type":"webauthn.create"}"#.to_vec(),
            attestation_object: vec![20, 21, 22],
            transports: vec!["internal".to_string()],
        }
    }

    /// Script the retrieval ceremony outcome.
    pub fn set_get_outcome(&self, outcome: GetOutcome) {
        *self
            .state
            .get_outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = outcome;
    }

    /// Script the creation ceremony outcome.
    pub fn set_create_outcome(&self, outcome: CreateOutcome) {
        *self
            .state
            .create_outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = outcome;
    }

    /// Options passed to retrieval ceremonies so far.
    #[must_use]
    pub fn get_options(&self) -> Vec<CredentialRequestOptions> {
        self.state
            .get_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Options passed to creation ceremonies so far.
    #[must_use]
    pub fn create_options(&self) -> Vec<CredentialCreationOptions> {
        self.state
            .create_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockCredentialSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialSource for MockCredentialSource {
    async fn get(&self, options: CredentialRequestOptions) -> GetOutcome {
        self.state
            .get_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(options);
        self.state
            .get_outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn create(&self, options: CredentialCreationOptions) -> CreateOutcome {
        self.state
            .create_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(options);
        self.state
            .create_outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
