//! Auth client factory and plugin registry.
//!
//! The [`AuthClient`] is an explicit composition wrapper around the
//! provider SDK adapter: it hashes any plaintext password parameter
//! before the call reaches the provider. This is a security contract —
//! plaintext passwords must never leave the application in network
//! traffic. Methods that verify rather than transmit secrets (TOTP,
//! backup codes) pass through unmodified.
//!
//! The [`AuthContext`] replaces the usual process-wide singletons with
//! an explicitly-owned, injectable object: it lazily constructs the
//! client on first access, reuses it afterwards, and — when the plugin
//! registry was mutated after construction — rebuilds it on the *next*
//! access, exactly once, preserving the last-used configuration.
//! Concurrent accessors may race to rebuild; rebuilding is idempotent,
//! so a benign duplicate rebuild is acceptable.

use crate::codec::digest;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::providers::{AuthProvider, ProviderSession, SignInResult};
use std::sync::{Arc, Mutex, PoisonError};

/// Built-in plugin identifier: admin capability.
pub const ADMIN_PLUGIN: &str = "admin";

/// Built-in plugin identifier: two-factor capability.
pub const TWO_FACTOR_PLUGIN: &str = "two-factor";

/// Built-in plugin identifier: passkey capability.
pub const PASSKEY_PLUGIN: &str = "passkey";

/// An opaque extension plugin passed to the provider at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Plugin {
    /// Plugin identifier.
    pub id: String,

    /// Plugin-specific options, opaque to this layer.
    pub options: serde_json::Value,
}

impl Plugin {
    /// Create a plugin with no options.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            options: serde_json::Value::Null,
        }
    }

    /// Attach options.
    #[must_use]
    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = options;
        self
    }
}

/// Ordered plugin list with a staleness generation counter.
///
/// Consulted only at client construction time; registering after the
/// client exists bumps the generation, which marks the built client
/// stale.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
    generation: u64,
}

impl PluginRegistry {
    /// Empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            plugins: Vec::new(),
            generation: 0,
        }
    }

    /// Append a plugin, preserving registration order.
    pub fn register(&mut self, plugin: Plugin) {
        self.plugins.push(plugin);
        self.generation += 1;
    }

    /// Registered plugins in registration order.
    #[must_use]
    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// Monotonic counter bumped on every registration.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Everything a provider factory needs to construct the SDK client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Resolved base URL (empty in development: same-origin proxy).
    pub base_url: String,

    /// Provider base path.
    pub base_path: String,

    /// Resolved API base (base URL + base path, or dev proxy path).
    pub api_base: String,

    /// Full plugin list in effect: built-ins, caller-supplied, then
    /// registry contents, in that order.
    pub plugins: Vec<Plugin>,
}

/// Password-hashing wrapper over the provider SDK adapter.
#[derive(Debug)]
pub struct AuthClient<P> {
    provider: P,
}

impl<P: AuthProvider> AuthClient<P> {
    /// Wrap a provider.
    #[must_use]
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Sign in by email. The password is digested before transmission.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection or a transport failure.
    pub async fn sign_in_email(&self, email: &str, password: &str) -> Result<SignInResult> {
        self.provider.sign_in_email(email, &digest(password)).await
    }

    /// Sign up by email. The password is digested before transmission.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection or a transport failure.
    pub async fn sign_up_email(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignInResult> {
        self.provider
            .sign_up_email(email, &digest(password), name)
            .await
    }

    /// End the provider session.
    ///
    /// # Errors
    ///
    /// Propagates a transport failure.
    pub async fn sign_out(&self) -> Result<()> {
        self.provider.sign_out().await
    }

    /// Change password. Both passwords are digested before transmission.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection or a transport failure.
    pub async fn change_password(&self, current: &str, new: &str) -> Result<()> {
        self.provider
            .change_password(&digest(current), &digest(new))
            .await
    }

    /// Complete a password reset. The new password is digested.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection or a transport failure.
    pub async fn reset_password(&self, new: &str, token: &str) -> Result<()> {
        self.provider.reset_password(&digest(new), token).await
    }

    /// Enable two-factor. The confirming password is digested.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection or a transport failure.
    pub async fn two_factor_enable(&self, password: &str) -> Result<()> {
        self.provider.two_factor_enable(&digest(password)).await
    }

    /// Disable two-factor. The confirming password is digested.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection or a transport failure.
    pub async fn two_factor_disable(&self, password: &str) -> Result<()> {
        self.provider.two_factor_disable(&digest(password)).await
    }

    /// Generate backup codes. The confirming password is digested.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection or a transport failure.
    pub async fn two_factor_generate_backup_codes(&self, password: &str) -> Result<Vec<String>> {
        self.provider
            .two_factor_generate_backup_codes(&digest(password))
            .await
    }

    /// Verify a TOTP code. Passes through unhashed.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection or a transport failure.
    pub async fn two_factor_verify_totp(&self, code: &str) -> Result<SignInResult> {
        self.provider.two_factor_verify_totp(code).await
    }

    /// Verify a backup code. Passes through unhashed.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection or a transport failure.
    pub async fn two_factor_verify_backup_code(&self, code: &str) -> Result<SignInResult> {
        self.provider.two_factor_verify_backup_code(code).await
    }

    /// Query the provider's current session.
    ///
    /// # Errors
    ///
    /// Propagates a transport failure.
    pub async fn get_session(&self) -> Result<ProviderSession> {
        self.provider.get_session().await
    }
}

type ProviderFactory<P> = Arc<dyn Fn(&ClientOptions) -> Result<P> + Send + Sync>;

struct BuiltClient<P> {
    client: Arc<AuthClient<P>>,
    generation: u64,
}

/// Injectable composition root owning the client singleton, the plugin
/// registry and the per-session feature cache.
pub struct AuthContext<P> {
    config: ClientConfig,
    factory: ProviderFactory<P>,
    registry: Mutex<PluginRegistry>,
    built: Mutex<Option<BuiltClient<P>>>,
    features: Mutex<Option<std::collections::HashMap<String, bool>>>,
}

impl<P: AuthProvider> AuthContext<P> {
    /// Create a context with a configuration and a provider factory.
    ///
    /// The factory runs once per (re)build with the resolved
    /// [`ClientOptions`]; a factory error is fatal and propagates out of
    /// [`AuthContext::client`].
    pub fn new<F>(config: ClientConfig, factory: F) -> Self
    where
        F: Fn(&ClientOptions) -> Result<P> + Send + Sync + 'static,
    {
        Self {
            config,
            factory: Arc::new(factory),
            registry: Mutex::new(PluginRegistry::new()),
            built: Mutex::new(None),
            features: Mutex::new(None),
        }
    }

    /// The configuration this context was created with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Register an extension plugin.
    ///
    /// If the client singleton already exists it is marked stale; the
    /// next [`AuthContext::client`] call rebuilds it exactly once.
    pub fn register_plugin(&self, plugin: Plugin) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register(plugin);
    }

    /// Get the client singleton, lazily (re)building as needed.
    ///
    /// # Errors
    ///
    /// Propagates the factory's construction failure — fatal, since no
    /// auth is possible without a client.
    pub fn client(&self) -> Result<Arc<AuthClient<P>>> {
        let generation = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation();

        let mut slot = self.built.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(built) = slot.as_ref() {
            if built.generation == generation {
                return Ok(Arc::clone(&built.client));
            }
            tracing::debug!("plugin registry changed, rebuilding auth client");
        }

        let options = self.resolve_options();
        let provider = (self.factory)(&options)?;
        let client = Arc::new(AuthClient::new(provider));
        *slot = Some(BuiltClient {
            client: Arc::clone(&client),
            generation,
        });
        Ok(client)
    }

    /// Drop the singleton and the feature cache (test isolation).
    pub fn reset(&self) {
        *self.built.lock().unwrap_or_else(PoisonError::into_inner) = None;
        *self.features.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Read the cached feature map, if fetched.
    #[must_use]
    pub fn cached_features(&self) -> Option<std::collections::HashMap<String, bool>> {
        self.features
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store the feature map. First successful fetch wins for the
    /// session.
    pub fn cache_features(&self, features: std::collections::HashMap<String, bool>) {
        let mut cache = self.features.lock().unwrap_or_else(PoisonError::into_inner);
        if cache.is_none() {
            *cache = Some(features);
        }
    }

    /// Resolve the construction options: environment-dependent base,
    /// then built-in plugins in fixed order (admin, two-factor,
    /// passkey), then caller-supplied plugins, then registry contents.
    fn resolve_options(&self) -> ClientOptions {
        let mut plugins = Vec::new();
        if self.config.admin {
            plugins.push(Plugin::new(ADMIN_PLUGIN));
        }
        if self.config.two_factor {
            let mut plugin = Plugin::new(TWO_FACTOR_PLUGIN);
            if let Some(redirect) = &self.config.two_factor_redirect {
                plugin = plugin.with_options(serde_json::json!({ "redirectTo": redirect }));
            }
            plugins.push(plugin);
        }
        if self.config.passkey {
            plugins.push(Plugin::new(PASSKEY_PLUGIN));
        }
        plugins.extend(self.config.plugins.iter().cloned());
        plugins.extend(
            self.registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .plugins()
                .iter()
                .cloned(),
        );

        ClientOptions {
            base_url: self.config.resolved_base_url(),
            base_path: self.config.base_path.clone(),
            api_base: self.config.api_base(),
            plugins,
        }
    }
}
