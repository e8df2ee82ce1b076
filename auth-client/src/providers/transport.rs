//! HTTP transport trait and request/response types.
//!
//! The transport is deliberately small: method, URL, headers, optional
//! JSON body, and a credentials mode controlling whether ambient session
//! cookies ride along. Everything the authenticated-fetch protocol needs
//! and nothing more, so mocks stay trivial.

use crate::error::{AuthError, Result};
use serde::de::DeserializeOwned;
use std::future::Future;

/// HTTP method.
///
/// The protocol only ever issues reads and JSON posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET request.
    Get,
    /// POST request.
    Post,
}

impl Method {
    /// Method name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Whether ambient session credentials (cookies) accompany a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialsMode {
    /// Caller expressed no preference; the protocol resolves this to
    /// [`CredentialsMode::Include`].
    #[default]
    Default,

    /// Attach ambient credentials.
    Include,

    /// Anonymous call. May still be overridden by the protocol for
    /// cookie-bound ceremony paths.
    Omit,
}

/// An outbound HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,

    /// Absolute URL, or an origin-relative path in proxy setups.
    pub url: String,

    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,

    /// Optional JSON body.
    pub body: Option<serde_json::Value>,

    /// Credentials mode.
    pub credentials: CredentialsMode,
}

impl HttpRequest {
    /// Build a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            credentials: CredentialsMode::Default,
        }
    }

    /// Build a POST request with a JSON body.
    #[must_use]
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
            credentials: CredentialsMode::Default,
        }
    }

    /// Set the credentials mode.
    #[must_use]
    pub const fn with_credentials(mut self, credentials: CredentialsMode) -> Self {
        self.credentials = credentials;
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Read a header value, case-insensitive on the name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace a header if present, otherwise add it.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            entry.1 = value;
        } else {
            self.headers.push((name.to_string(), value));
        }
    }

    /// The path component of the URL (host stripped, query kept).
    #[must_use]
    pub fn path(&self) -> &str {
        match self.url.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
            None => self.url.as_str(),
        }
    }
}

/// An inbound HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,

    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,

    /// Parsed JSON body, when the response carried one.
    pub body: Option<serde_json::Value>,
}

impl HttpResponse {
    /// Build a response with a status and JSON body.
    #[must_use]
    pub fn new(status: u16, body: Option<serde_json::Value>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Deserialize the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidPayload`] when the body is missing or
    /// does not match the expected shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self
            .body
            .clone()
            .ok_or_else(|| AuthError::InvalidPayload("empty response body".to_string()))?;
        serde_json::from_value(body)
            .map_err(|error| AuthError::InvalidPayload(format!("unexpected response shape: {error}")))
    }

    /// Extract a server-provided error message from the body, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        for key in ["message", "error"] {
            if let Some(message) = body.get(key).and_then(serde_json::Value::as_str) {
                return Some(message.to_string());
            }
        }
        None
    }
}

/// Whether a URL path contains `prefix` starting at a path-segment
/// boundary and ending at one, with any query string ignored.
///
/// `/api/auth/token` matches `/token`; `/api/tokens` and
/// `/api/data?from=/token` do not.
#[must_use]
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let (path, _query) = path.split_once('?').unwrap_or((path, ""));
    path.match_indices(prefix).any(|(index, _)| {
        let rest = &path[index + prefix.len()..];
        rest.is_empty() || rest.starts_with('/')
    })
}

/// HTTP transport.
///
/// The single seam through which every outbound call flows. Production
/// uses a `reqwest`-backed implementation; the 401 interceptor wraps any
/// implementation by decoration.
pub trait HttpTransport: Send + Sync {
    /// Issue a request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Transport`] on network failure. Non-2xx
    /// statuses are **not** errors; the protocol inspects them.
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}
