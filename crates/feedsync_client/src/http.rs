//! HTTP client abstraction.
//!
//! The actual HTTP stack is injected behind a trait so the core stays
//! transport-agnostic and testable (reqwest, ureq, a browser fetch
//! bridge, or a scripted mock all fit).

use parking_lot::Mutex;
use std::collections::VecDeque;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Returns the method's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// A fully prepared request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including query string.
    pub url: String,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// JSON body, when present.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Returns the first header matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A received response, any status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with a JSON body.
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("content-type".into(), "application/json".into())],
            body: body.into().into_bytes(),
        }
    }

    /// Returns the first header matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// `Err` means the request never received a response (transport
/// failure); `Ok` carries the response whatever its status.
pub trait HttpClient: Send + Sync {
    /// Executes one request.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// A scripted HTTP client for testing.
///
/// Responses are consumed in FIFO order; every executed request is
/// recorded for inspection.
#[derive(Default)]
pub struct MockHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, String>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    /// Creates an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: HttpResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queues a transport failure.
    pub fn push_transport_error(&self, message: impl Into<String>) {
        self.responses.lock().push_back(Err(message.into()));
    }

    /// Returns all executed requests so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of executed requests.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl HttpClient for MockHttpClient {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted response".into()))
    }
}
