//! Client configuration and environment resolution.
//!
//! Configuration values are provided by the application; the only thing
//! resolved implicitly is the runtime environment, because the API base
//! differs between development (same-origin proxy, so WebAuthn origin
//! validation sees a consistent origin) and production (explicit base
//! URL).

use crate::client::Plugin;

/// Fallback API base when no base URL is configured in production.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default provider base path.
pub const DEFAULT_BASE_PATH: &str = "/api/auth";

/// Same-origin proxy prefix used in development.
pub const DEV_PROXY_PREFIX: &str = "/api";

/// Runtime environment.
///
/// Detection is deliberately a **runtime** check of process environment
/// markers, not a build-time constant: the client may run inside a
/// pre-compiled distributable whose build-time flags are frozen to the
/// build environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Local development (same-origin proxy).
    Development,

    /// Everything else.
    Production,
}

impl Environment {
    /// Detect the environment from the `APP_ENV` process variable.
    ///
    /// `development` or `dev` (case-insensitive) selects
    /// [`Environment::Development`]; anything else, including an unset
    /// variable, is [`Environment::Production`].
    #[must_use]
    pub fn detect() -> Self {
        match std::env::var("APP_ENV") {
            Ok(value) if value.eq_ignore_ascii_case("development") || value.eq_ignore_ascii_case("dev") => {
                Self::Development
            }
            _ => Self::Production,
        }
    }

    /// Whether this is the development environment.
    #[must_use]
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Auth client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Explicit provider base URL (production). `None` falls back to
    /// [`DEFAULT_BASE_URL`].
    pub base_url: Option<String>,

    /// Provider base path appended to the base URL.
    pub base_path: String,

    /// Enable the admin capability plugin.
    pub admin: bool,

    /// Enable the two-factor capability plugin.
    pub two_factor: bool,

    /// Enable the passkey capability plugin.
    pub passkey: bool,

    /// Route the two-factor plugin redirects to when the provider
    /// signals a 2FA challenge.
    pub two_factor_redirect: Option<String>,

    /// Caller-supplied plugins, appended after the built-in ones.
    pub plugins: Vec<Plugin>,
}

impl ClientConfig {
    /// Create a configuration with the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// Set the provider base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Toggle the admin capability.
    #[must_use]
    pub const fn with_admin(mut self, enabled: bool) -> Self {
        self.admin = enabled;
        self
    }

    /// Toggle the two-factor capability.
    #[must_use]
    pub const fn with_two_factor(mut self, enabled: bool) -> Self {
        self.two_factor = enabled;
        self
    }

    /// Toggle the passkey capability.
    #[must_use]
    pub const fn with_passkey(mut self, enabled: bool) -> Self {
        self.passkey = enabled;
        self
    }

    /// Set the two-factor challenge redirect route.
    #[must_use]
    pub fn with_two_factor_redirect(mut self, route: impl Into<String>) -> Self {
        self.two_factor_redirect = Some(route.into());
        self
    }

    /// Append a caller-supplied plugin.
    #[must_use]
    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Resolve the API base for the current runtime environment.
    ///
    /// Development: same-origin proxy path (`/api` + base path), with an
    /// empty base URL. Production: configured base URL + base path,
    /// falling back to [`DEFAULT_BASE_URL`].
    ///
    /// Downstream code must not bypass this resolution; every provider
    /// endpoint URL is built from it.
    #[must_use]
    pub fn api_base(&self) -> String {
        if Environment::detect().is_development() {
            format!("{DEV_PROXY_PREFIX}{}", self.base_path)
        } else {
            let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
            format!("{base_url}{}", self.base_path)
        }
    }

    /// The base URL half of [`ClientConfig::api_base`].
    #[must_use]
    pub fn resolved_base_url(&self) -> String {
        if Environment::detect().is_development() {
            String::new()
        } else {
            self.base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            base_path: DEFAULT_BASE_PATH.to_string(),
            admin: false,
            two_factor: false,
            passkey: false,
            two_factor_redirect: None,
            plugins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detection_is_a_runtime_check() {
        temp_env::with_var("APP_ENV", Some("development"), || {
            assert_eq!(Environment::detect(), Environment::Development);
        });
        temp_env::with_var("APP_ENV", Some("DEV"), || {
            assert_eq!(Environment::detect(), Environment::Development);
        });
        temp_env::with_var("APP_ENV", Some("production"), || {
            assert_eq!(Environment::detect(), Environment::Production);
        });
        temp_env::with_var("APP_ENV", None::<&str>, || {
            assert_eq!(Environment::detect(), Environment::Production);
        });
    }

    #[test]
    fn test_api_base_uses_dev_proxy_in_development() {
        temp_env::with_var("APP_ENV", Some("development"), || {
            let config = ClientConfig::new("https://auth.example.com");
            assert_eq!(config.api_base(), "/api/api/auth");
            assert_eq!(config.resolved_base_url(), "");
        });
    }

    #[test]
    fn test_api_base_uses_configured_url_in_production() {
        temp_env::with_var("APP_ENV", None::<&str>, || {
            let config = ClientConfig::new("https://auth.example.com").with_base_path("/auth");
            assert_eq!(config.api_base(), "https://auth.example.com/auth");
        });
    }

    #[test]
    fn test_api_base_falls_back_to_local_default() {
        temp_env::with_var("APP_ENV", None::<&str>, || {
            let config = ClientConfig::default();
            assert_eq!(config.api_base(), "http://localhost:3000/api/auth");
        });
    }
}
