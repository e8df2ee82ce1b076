//! Process-wide 401 safety net.
//!
//! A transport decorator installed explicitly at application bootstrap
//! (composition, not global monkey-patching): every response status
//! flows through it. A 401 outside the auth-endpoint allowlist, while
//! the local state considers the session authenticated and the current
//! route is not itself a public auth page, triggers session teardown
//! plus the application's redirect hook — once, with a short cooldown
//! collapsing bursts of concurrently-failing requests into a single
//! trigger.

use crate::providers::{CookieJar, HttpRequest, HttpResponse, HttpTransport, path_has_prefix};
use crate::store::AuthStateStore;
use crate::error::Result;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::warn;

/// Endpoints where a 401 is an expected, non-fatal outcome.
pub const AUTH_ENDPOINT_ALLOWLIST: [&str; 9] = [
    "/sign-in",
    "/sign-up",
    "/sign-out",
    "/forget-password",
    "/reset-password",
    "/two-factor",
    "/passkey",
    "/token",
    "/get-session",
];

/// Burst-collapsing window for the teardown side effect. The flag only
/// gates a user-visible navigation, not data integrity, so a plain
/// timestamp check suffices.
const TRIGGER_COOLDOWN: Duration = Duration::from_secs(2);

type RouteProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;
type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// 401-intercepting transport decorator.
pub struct UnauthorizedInterceptor<T, J> {
    inner: T,
    store: AuthStateStore<J>,
    public_routes: Vec<String>,
    current_route: RouteProvider,
    on_unauthorized: UnauthorizedHook,
    last_trigger: Mutex<Option<Instant>>,
}

impl<T, J> UnauthorizedInterceptor<T, J>
where
    T: HttpTransport,
    J: CookieJar,
{
    /// Wrap a transport.
    ///
    /// `current_route` reports the route the application is showing
    /// (`None` outside a navigation context); `on_unauthorized` performs
    /// the redirect after local state has been cleared.
    pub fn new<R, H>(
        inner: T,
        store: AuthStateStore<J>,
        current_route: R,
        on_unauthorized: H,
    ) -> Self
    where
        R: Fn() -> Option<String> + Send + Sync + 'static,
        H: Fn() + Send + Sync + 'static,
    {
        Self {
            inner,
            store,
            public_routes: Vec::new(),
            current_route: Arc::new(current_route),
            on_unauthorized: Arc::new(on_unauthorized),
            last_trigger: Mutex::new(None),
        }
    }

    /// Declare public auth pages (login, register, ...) on which a 401
    /// never triggers a redirect.
    #[must_use]
    pub fn with_public_routes(mut self, routes: Vec<String>) -> Self {
        self.public_routes = routes;
        self
    }

    /// Whether a URL path belongs to the auth-endpoint allowlist.
    /// Matching is on path-segment boundaries, so `/api/tokens` does
    /// not count as the `/token` endpoint.
    #[must_use]
    pub fn is_exempt_endpoint(path: &str) -> bool {
        AUTH_ENDPOINT_ALLOWLIST
            .iter()
            .any(|endpoint| path_has_prefix(path, endpoint))
    }

    fn on_public_route(&self) -> bool {
        (self.current_route)().is_some_and(|route| {
            self.public_routes
                .iter()
                .any(|public| route.starts_with(public.as_str()))
        })
    }

    /// Cooldown gate: `true` at most once per window.
    fn should_trigger(&self) -> bool {
        let mut last = self
            .last_trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        match *last {
            Some(previous) if now.duration_since(previous) < TRIGGER_COOLDOWN => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    fn handle_unauthorized(&self, path: &str) {
        if Self::is_exempt_endpoint(path) || self.on_public_route() {
            return;
        }
        if !self.store.is_authenticated() {
            return;
        }
        if !self.should_trigger() {
            return;
        }
        warn!(path, "unexpected 401, tearing down session");
        self.store.clear();
        (self.on_unauthorized)();
    }
}

impl<T, J> HttpTransport for UnauthorizedInterceptor<T, J>
where
    T: HttpTransport,
    J: CookieJar,
{
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let path = request.path().to_string();
        let response = self.inner.send(request).await?;
        if response.status == 401 {
            self.handle_unauthorized(&path);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::mocks::{MockCookieJar, MockTransport};
    use crate::state::{AuthMode, User};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn authenticated_store() -> (MockCookieJar, AuthStateStore<MockCookieJar>) {
        let jar = MockCookieJar::new();
        let store = AuthStateStore::new(Arc::new(jar.clone()));
        store.set_user(
            Some(User::new("u1".to_string(), "user@example.com".to_string())),
            AuthMode::Cookie,
        );
        (jar, store)
    }

    fn interceptor(
        transport: MockTransport,
        store: AuthStateStore<MockCookieJar>,
        triggers: Arc<AtomicUsize>,
    ) -> UnauthorizedInterceptor<MockTransport, MockCookieJar> {
        UnauthorizedInterceptor::new(
            transport,
            store,
            || Some("/boards".to_string()),
            move || {
                triggers.fetch_add(1, Ordering::SeqCst);
            },
        )
    }

    #[tokio::test]
    async fn test_unexpected_401_tears_down_the_session_once() {
        let (_jar, store) = authenticated_store();
        let transport = MockTransport::new();
        let triggers = Arc::new(AtomicUsize::new(0));
        let interceptor = interceptor(transport.clone(), store.clone(), Arc::clone(&triggers));

        transport.enqueue_status(401);
        transport.enqueue_status(401);
        interceptor
            .send(HttpRequest::get("/api/boards/42"))
            .await
            .unwrap();
        assert!(!store.is_authenticated());
        assert_eq!(triggers.load(Ordering::SeqCst), 1);

        // A burst of concurrently-failing requests collapses into the
        // first trigger (and the session is already cleared anyway).
        interceptor
            .send(HttpRequest::get("/api/boards/43"))
            .await
            .unwrap();
        assert_eq!(triggers.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_allowlisted_endpoint_401_is_ignored() {
        let (_jar, store) = authenticated_store();
        let transport = MockTransport::new();
        let triggers = Arc::new(AtomicUsize::new(0));
        let interceptor = interceptor(transport.clone(), store.clone(), Arc::clone(&triggers));

        transport.enqueue_status(401);
        interceptor
            .send(HttpRequest::get("/api/auth/sign-in/email"))
            .await
            .unwrap();
        assert!(store.is_authenticated());
        assert_eq!(triggers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_anonymous_401_is_ignored() {
        let jar = MockCookieJar::new();
        let store = AuthStateStore::new(Arc::new(jar));
        let transport = MockTransport::new();
        let triggers = Arc::new(AtomicUsize::new(0));
        let interceptor = interceptor(transport.clone(), store, Arc::clone(&triggers));

        transport.enqueue_status(401);
        interceptor
            .send(HttpRequest::get("/api/boards/42"))
            .await
            .unwrap();
        assert_eq!(triggers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_public_route_401_is_ignored() {
        let (_jar, store) = authenticated_store();
        let transport = MockTransport::new();
        let triggers = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&triggers);
        let interceptor = UnauthorizedInterceptor::new(
            transport.clone(),
            store.clone(),
            || Some("/login".to_string()),
            move || {
                sink.fetch_add(1, Ordering::SeqCst);
            },
        )
        .with_public_routes(vec!["/login".to_string(), "/register".to_string()]);

        transport.enqueue_status(401);
        interceptor
            .send(HttpRequest::get("/api/boards/42"))
            .await
            .unwrap();
        assert!(store.is_authenticated());
        assert_eq!(triggers.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_allowlist_matches_full_urls() {
        assert!(UnauthorizedInterceptor::<
            crate::mocks::MockTransport,
            crate::mocks::MockCookieJar,
        >::is_exempt_endpoint("/api/auth/sign-in/email"));
        assert!(UnauthorizedInterceptor::<
            crate::mocks::MockTransport,
            crate::mocks::MockCookieJar,
        >::is_exempt_endpoint("/api/auth/passkey/verify-authentication"));
        assert!(!UnauthorizedInterceptor::<
            crate::mocks::MockTransport,
            crate::mocks::MockCookieJar,
        >::is_exempt_endpoint("/api/boards/42"));
        // A lookalike segment is not the token endpoint.
        assert!(!UnauthorizedInterceptor::<
            crate::mocks::MockTransport,
            crate::mocks::MockCookieJar,
        >::is_exempt_endpoint("/api/tokens/rotate"));
    }
}
