//! Mock cookie jar.

use crate::providers::{CookieAttributes, CookieJar};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct JarState {
    values: Mutex<HashMap<String, String>>,
    removed: Mutex<Vec<(String, String)>>,
    available: AtomicBool,
}

/// Mock [`CookieJar`] with an availability toggle.
///
/// Toggling availability off simulates a context without store access
/// (pre-hydration server render): reads return `None`, writes are
/// ignored.
#[derive(Debug, Clone)]
pub struct MockCookieJar {
    state: Arc<JarState>,
}

impl MockCookieJar {
    /// Empty, available jar.
    #[must_use]
    pub fn new() -> Self {
        let state = JarState::default();
        state.available.store(true, Ordering::SeqCst);
        Self {
            state: Arc::new(state),
        }
    }

    /// Toggle store access.
    pub fn set_available(&self, available: bool) {
        self.state.available.store(available, Ordering::SeqCst);
    }

    /// Records removed so far, as (name, path) pairs.
    #[must_use]
    pub fn removed(&self) -> Vec<(String, String)> {
        self.state
            .removed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockCookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar for MockCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        if !self.state.available.load(Ordering::SeqCst) {
            return None;
        }
        self.state
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn set(&self, name: &str, value: &str, attributes: &CookieAttributes) {
        if !self.state.available.load(Ordering::SeqCst) {
            return;
        }
        let mut values = self
            .state
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if attributes.max_age_secs <= 0 {
            values.remove(name);
        } else {
            values.insert(name.to_string(), value.to_string());
        }
    }

    fn remove(&self, name: &str, path: &str) {
        if !self.state.available.load(Ordering::SeqCst) {
            return;
        }
        self.state
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        self.state
            .removed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), path.to_string()));
    }
}
