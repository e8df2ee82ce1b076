//! In-process cookie jar.
//!
//! Backs the persistent store for non-browser consumers (native shells,
//! integration harnesses). A read-only construction models the
//! pre-hydration server-side-render context: reads work, writes are
//! silently ignored, matching the store layer's "no-op without store
//! access" contract.

use crate::providers::{CookieAttributes, CookieJar};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StoredCookie {
    value: String,
    expires_at: Instant,
}

/// In-memory [`CookieJar`] with max-age expiry.
#[derive(Debug)]
pub struct MemoryCookieJar {
    entries: Mutex<HashMap<String, StoredCookie>>,
    writable: bool,
}

impl MemoryCookieJar {
    /// Empty, writable jar.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            writable: true,
        }
    }

    /// Read-only jar (server-side-render context): writes are ignored.
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            writable: false,
        }
    }
}

impl Default for MemoryCookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let cookie = entries.get(name)?;
        if Instant::now() >= cookie.expires_at {
            return None;
        }
        Some(cookie.value.clone())
    }

    fn set(&self, name: &str, value: &str, attributes: &CookieAttributes) {
        if !self.writable {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if attributes.max_age_secs <= 0 {
            entries.remove(name);
            return;
        }
        let max_age = Duration::from_secs(attributes.max_age_secs.unsigned_abs());
        entries.insert(
            name.to_string(),
            StoredCookie {
                value: value.to_string(),
                expires_at: Instant::now() + max_age,
            },
        );
    }

    fn remove(&self, name: &str, _path: &str) {
        if !self.writable {
            return;
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}
