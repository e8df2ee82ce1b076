//! Mock HTTP transport with scripted responses.

use crate::error::{AuthError, Result};
use crate::providers::{HttpRequest, HttpResponse, HttpTransport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct TransportState {
    queue: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

/// Mock [`HttpTransport`].
///
/// Responses are scripted in FIFO order; every request is recorded for
/// call-count and shape assertions. An exhausted queue yields a
/// transport error so tests fail loudly on unexpected extra calls.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<TransportState>,
}

impl MockTransport {
    /// Empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next response.
    pub fn enqueue(&self, response: HttpResponse) {
        self.state
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(response));
    }

    /// Script the next response as a status + JSON body.
    pub fn enqueue_json(&self, status: u16, body: serde_json::Value) {
        self.enqueue(HttpResponse::new(status, Some(body)));
    }

    /// Script the next response as a bodyless status.
    pub fn enqueue_status(&self, status: u16) {
        self.enqueue(HttpResponse::new(status, None));
    }

    /// Script the next call to fail at the transport level.
    pub fn enqueue_error(&self, message: &str) {
        self.state
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(AuthError::Transport(message.to_string())));
    }

    /// All requests seen so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests whose URL contains the given fragment.
    #[must_use]
    pub fn calls_to(&self, fragment: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url.contains(fragment))
            .count()
    }
}

impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        self.state
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(AuthError::Transport(
                    "no scripted response left".to_string(),
                ))
            })
    }
}
