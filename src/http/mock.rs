//! Scriptable [`HttpClient`] for tests and offline demos.

use super::{HttpClient, HttpResponse, Method, OutboundRequest, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

type MockResult = Result<HttpResponse, TransportError>;

enum MockResponse {
    Immediate(MockResult),
    /// Waits for the paired sender to fire (or drop) before answering.
    Triggered {
        response: MockResult,
        trigger: oneshot::Receiver<()>,
    },
}

/// Record of a call made to the mock client.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub method: Method,
    pub url: String,
    /// `(field, file_name)` for every multipart part, in body order.
    pub parts: Vec<(String, String)>,
}

/// Mock HTTP client keyed by `"{METHOD} {url}"`.
///
/// Responses for the same key are returned in FIFO order. A request with no
/// configured response fails with a [`TransportError`].
///
/// # Example
/// ```rust
/// use compila_pdf::http::{HttpResponse, MockHttpClient};
///
/// let mock = MockHttpClient::new();
/// mock.add_response(
///     "GET http://localhost/api/barcode/health",
///     Ok(HttpResponse::new(200, r#"{"status":"ok"}"#)),
/// );
/// ```
#[derive(Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    in_flight: Arc<AtomicUsize>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&self, key: &str, response: MockResult) {
        self.responses
            .lock()
            .entry(key.to_string())
            .or_default()
            .push_back(MockResponse::Immediate(response));
    }

    /// Add a response that completes only once the returned sender fires.
    pub fn add_response_with_trigger(&self, key: &str, response: MockResult) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.responses
            .lock()
            .entry(key.to_string())
            .or_default()
            .push_back(MockResponse::Triggered {
                response,
                trigger: rx,
            });
        tx
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Requests currently waiting inside [`HttpClient::execute`].
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: &OutboundRequest) -> MockResult {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
        };

        let parts = match &request.body {
            super::RequestBody::Multipart(parts) => parts
                .iter()
                .map(|p| (p.field.clone(), p.file_name.clone()))
                .collect(),
            super::RequestBody::Empty => Vec::new(),
        };
        self.calls.lock().push(MockCall {
            method: request.method,
            url: request.url.clone(),
            parts,
        });

        let key = format!("{} {}", request.method, request.url);
        let next = self
            .responses
            .lock()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front());

        match next {
            Some(MockResponse::Immediate(response)) => response,
            Some(MockResponse::Triggered { response, trigger }) => {
                let _ = trigger.await;
                response
            }
            None => Err(TransportError::new(format!(
                "No mock response configured for {key}"
            ))),
        }
    }
}

struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
