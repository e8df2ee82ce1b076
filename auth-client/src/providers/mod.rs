//! External collaborator interfaces.
//!
//! This module defines traits for every external dependency the auth
//! manager touches: the durable small-blob store, the HTTP transport,
//! the external auth-provider SDK and the platform credential API.
//!
//! Providers are **interfaces**, not implementations. The state machine
//! depends on these traits; production code supplies concrete
//! implementations (see `stores/`) and tests supply mocks (see
//! `mocks/`). This keeps the protocol logic runnable at memory speed.

pub mod cookies;
pub mod credentials;
pub mod sdk;
pub mod transport;

pub use cookies::{CookieAttributes, CookieJar};
pub use credentials::{
    AssertionCredential, CeremonyError, CredentialCreationOptions, CredentialRequestOptions,
    CredentialSource, RegisteredCredential,
};
pub use sdk::{AuthProvider, ProviderSession, SignInResult};
pub use transport::{
    CredentialsMode, HttpRequest, HttpResponse, HttpTransport, Method, path_has_prefix,
};
