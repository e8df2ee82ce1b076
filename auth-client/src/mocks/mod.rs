//! Mock collaborator implementations for testing.
//!
//! Simple, scripted, in-memory implementations of all provider traits.
//! Mocks record the calls they receive so tests can assert call counts
//! and argument shapes (e.g., that the token endpoint was never hit, or
//! that no plaintext password reached the provider). All mocks are
//! `Clone` and share state across clones, so a test can keep a handle
//! to a mock it handed to a factory.

pub mod cookies;
pub mod credentials;
pub mod provider;
pub mod transport;

pub use cookies::MockCookieJar;
pub use credentials::MockCredentialSource;
pub use provider::MockAuthProvider;
pub use transport::MockTransport;
