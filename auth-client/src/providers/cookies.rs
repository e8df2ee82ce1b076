//! Durable small-blob store trait.

/// Attributes applied when writing a record.
///
/// Mirrors the cookie attributes the provider itself uses: a max-age
/// window and a `SameSite=Lax`-equivalent cross-site policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    /// Validity window in seconds. Zero or negative clears the record.
    pub max_age_secs: i64,

    /// Path scope.
    pub path: String,

    /// `SameSite=Lax`-equivalent policy.
    pub same_site_lax: bool,
}

impl CookieAttributes {
    /// Attributes for an auth record: given window, root path, lax.
    #[must_use]
    pub fn window(max_age_secs: i64) -> Self {
        Self {
            max_age_secs,
            path: "/".to_string(),
            same_site_lax: true,
        }
    }

    /// Attributes that immediately expire the record.
    #[must_use]
    pub fn expired() -> Self {
        Self::window(0)
    }
}

/// Cookie-like durable key→string store.
///
/// Implementations must be readable in every context and silently
/// ignore writes in contexts without store access (e.g., a server-side
/// render before hydration): the store layer never errors, it treats
/// the inaccessible case as "no state".
///
/// Operations are synchronous; callers are never suspended at the store
/// boundary.
pub trait CookieJar: Send + Sync {
    /// Read a record, or `None` when absent or unreadable.
    fn get(&self, name: &str) -> Option<String>;

    /// Write a record with the given attributes. No-op when the store
    /// is not writable in the current context.
    fn set(&self, name: &str, value: &str, attributes: &CookieAttributes);

    /// Remove a record under a specific path scope.
    fn remove(&self, name: &str, path: &str);
}
