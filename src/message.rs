//! Request and response descriptors passed through the chain.

use crate::body::Body;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode, Version};
use url::Url;

/// Outgoing request.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Body,
}

impl Request {
    /// Create a request with no headers and an empty body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// Parse `url` and create a GET request for it.
    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Method::GET, Url::parse(url)?))
    }

    /// Append a header value, keeping existing values for the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Snapshot of everything but the body.
    pub fn head(&self) -> RequestHead {
        RequestHead {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
        }
    }
}

/// Method, URL and headers of a request that has already been sent.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHead {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

/// Incoming response.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    /// Status line text, e.g. `"200 OK"`.
    pub status_text: String,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Body,
    /// The request that produced this response.
    pub request: Option<RequestHead>,
}

impl Response {
    /// Create an HTTP/1.1 response with the canonical status text.
    pub fn new(status: StatusCode, body: impl Into<Body>) -> Self {
        Self {
            status,
            status_text: status_text(status),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: body.into(),
            request: None,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_request(mut self, request: RequestHead) -> Self {
        self.request = Some(request);
        self
    }

    /// Status line followed by one `name: value` line per header; no body.
    pub fn metadata(&self) -> String {
        format!(
            "{} {:?}\r\n{}",
            self.status_text,
            self.version,
            render_headers(&self.headers)
        )
    }
}

/// Render headers as `name: value\r\n` lines, one per value.
///
/// Line-oriented output is what header redaction matches against.
pub fn render_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            format!("{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes()))
        })
        .collect()
}

/// Render a status as `"<code> <reason>"`, or just the code when unknown.
pub fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}
