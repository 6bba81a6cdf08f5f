//! HTTP transport abstraction.
//!
//! The controller and retriever describe what they need as an
//! [`OutboundRequest`]; an [`HttpClient`] executes it. The production client
//! wraps `reqwest`, and [`mock::MockHttpClient`] lets tests script responses
//! and hold a request open to observe the in-flight state.
//!
//! A transport error means no response was received. Any status code,
//! 2xx or not, comes back as an [`HttpResponse`] for the caller to judge.

pub mod mock;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use mock::{MockCall, MockHttpClient};

/// Methods the service contract uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// One file part of a multipart body.
#[derive(Debug, Clone)]
pub struct MultipartPart {
    /// Form field name (`guias` or `comprovantes`); repeated per file.
    pub field: String,
    /// Original filename of the upload.
    pub file_name: String,
    pub content_type: String,
    pub payload: Arc<[u8]>,
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Multipart(Vec<MultipartPart>),
}

/// A fully described request, independent of the HTTP library.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
    pub timeout: Duration,
}

impl OutboundRequest {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: RequestBody::Empty,
            timeout,
        }
    }

    pub fn multipart(url: impl Into<String>, parts: Vec<MultipartPart>, timeout: Duration) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: RequestBody::Multipart(parts),
            timeout,
        }
    }

    /// Parts carrying `field`, in body order.
    pub fn parts_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a MultipartPart> + 'a {
        let parts: &[MultipartPart] = match &self.body {
            RequestBody::Multipart(parts) => parts,
            RequestBody::Empty => &[],
        };
        parts.iter().filter(move |p| p.field == field)
    }
}

/// Response from an HTTP request, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was received (connect, TLS, timeout, body read).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Executes [`OutboundRequest`]s.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: &OutboundRequest) -> Result<HttpResponse, TransportError>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Production HTTP client using reqwest.
#[derive(Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing client (shared connection pool, custom TLS roots, …).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: &OutboundRequest) -> Result<HttpResponse, TransportError> {
        let mut req = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        }
        .timeout(request.timeout);

        if let RequestBody::Multipart(parts) = &request.body {
            let mut form = reqwest::multipart::Form::new();
            for part in parts {
                let file_part = reqwest::multipart::Part::bytes(part.payload.to_vec())
                    .file_name(part.file_name.clone())
                    .mime_str(&part.content_type)
                    .map_err(|e| TransportError::new(format!("invalid content type: {e}")))?;
                form = form.part(part.field.clone(), file_part);
            }
            tracing::trace!(parts = parts.len(), "Attached multipart body");
            req = req.multipart(form);
        }

        let response = req.send().await.map_err(|e| {
            tracing::error!(error = %e, "HTTP request failed");
            describe_reqwest_error(&e, request.timeout)
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| describe_reqwest_error(&e, request.timeout))?
            .to_vec();

        tracing::debug!(status, response_len = body.len(), "HTTP request completed");

        Ok(HttpResponse { status, body })
    }
}

fn describe_reqwest_error(e: &reqwest::Error, timeout: Duration) -> TransportError {
    if e.is_timeout() {
        TransportError::new(format!(
            "The service did not answer within {}s",
            timeout.as_secs()
        ))
    } else if e.is_connect() {
        TransportError::new(format!("Could not connect to the service: {e}"))
    } else {
        TransportError::new(e.to_string())
    }
}
