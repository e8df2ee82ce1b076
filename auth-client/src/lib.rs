//! # Dual-mode authentication client
//!
//! Client-side authentication state manager providing dual-mode
//! (cookie-primary, JWT-fallback) session handling, WebAuthn passkey
//! ceremonies, and automatic re-authentication on transport failure,
//! layered over an external auth provider's SDK.
//!
//! ## Architecture
//!
//! ```text
//! UI actions → SessionManager → AuthClient (hashes credentials,
//!   delegates to the provider adapter) → AuthFetch (chooses transport,
//!   retries once on 401) → AuthStateStore (mode & token records)
//!     ⇄ UnauthorizedInterceptor (global safety net)
//! ```
//!
//! Every external dependency — the durable record store, the HTTP
//! transport, the provider SDK, the platform credential API — sits
//! behind a trait in [`providers`], so the whole state machine runs at
//! memory speed under test.
//!
//! ## Mode state machine
//!
//! `cookie` is the primary transport. A 401 on an authenticated
//! cookie-mode request triggers exactly one switch to `jwt` (bearer
//! token fallback) and a single retry; `jwt` then persists until logout
//! resets the session to `cookie`. A fallback token may be pre-fetched
//! while still in cookie mode; token presence alone never implies jwt
//! mode.
//!
//! ## Example
//!
//! ```rust,ignore
//! use auth_client::*;
//!
//! let jar = std::sync::Arc::new(stores::MemoryCookieJar::new());
//! let store = store::AuthStateStore::new(jar);
//! let config = config::ClientConfig::new("https://auth.example.com")
//!     .with_passkey(true)
//!     .with_two_factor(true);
//! let transport = std::sync::Arc::new(stores::ReqwestTransport::new()?);
//! let fetch = fetch::AuthFetch::new(transport, store, config.api_base());
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod fetch;
pub mod interceptor;
pub mod providers;
pub mod session;
pub mod state;
pub mod store;
pub mod stores;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use client::{AuthClient, AuthContext, Plugin, PluginRegistry};
pub use config::{ClientConfig, Environment};
pub use error::{AuthError, Result};
pub use fetch::AuthFetch;
pub use interceptor::UnauthorizedInterceptor;
pub use session::SessionManager;
pub use state::{AuthMode, AuthState, User};
pub use store::AuthStateStore;
