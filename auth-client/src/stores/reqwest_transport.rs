//! `reqwest`-backed HTTP transport.
//!
//! Two underlying clients: one with a shared cookie store for
//! credentialed calls, one without for anonymous calls, selected per
//! request by its [`CredentialsMode`]. URLs must be absolute here; the
//! development same-origin proxy path is a browser concern.

use crate::error::{AuthError, Result};
use crate::providers::{CredentialsMode, HttpRequest, HttpResponse, HttpTransport, Method};

/// Production [`HttpTransport`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    with_cookies: reqwest::Client,
    anonymous: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Transport`] if the TLS backend fails to
    /// initialize.
    pub fn new() -> Result<Self> {
        let with_cookies = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|error| AuthError::Transport(error.to_string()))?;
        let anonymous = reqwest::Client::builder()
            .build()
            .map_err(|error| AuthError::Transport(error.to_string()))?;
        Ok(Self {
            with_cookies,
            anonymous,
        })
    }

    fn client_for(&self, credentials: CredentialsMode) -> &reqwest::Client {
        match credentials {
            CredentialsMode::Omit => &self.anonymous,
            CredentialsMode::Default | CredentialsMode::Include => &self.with_cookies,
        }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let client = self.client_for(request.credentials);
        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| AuthError::Transport(error.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let text = response
            .text()
            .await
            .map_err(|error| AuthError::Transport(error.to_string()))?;
        let body = serde_json::from_str(&text).ok();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
