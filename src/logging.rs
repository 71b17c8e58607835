//! Request/response logging with sanitized dumps.

use crate::body::Body;
use crate::error::{DumpError, TransportError};
use crate::message::{render_headers, Request, Response};
use crate::sanitize::{Redactor, Sanitizer};
use crate::transport::Transport;
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Content type whose bodies are never written to the log.
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// One logged request/response exchange. Every field is already sanitized.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    /// HTTP/1.1 dump of the request; empty when the URL has no host.
    pub request: String,
    /// Response metadata, `None` when the delegate returned no response.
    pub response: Option<String>,
    /// Response body text, only present when body capture was enabled.
    pub response_body: Option<String>,
    /// Delegate error message.
    pub error: Option<String>,
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "http request: {}--->response: {}",
            self.request,
            self.response.as_deref().unwrap_or("<nil>")
        )?;
        if let Some(body) = &self.response_body {
            write!(f, "\nresponse body: {}", body)?;
        }
        write!(f, "\n--->err: {}", self.error.as_deref().unwrap_or("<nil>"))
    }
}

/// Destination for log output, split into two logical channels.
pub trait LogSink: Send + Sync {
    /// A completed request/response exchange.
    fn exchange(&self, entry: &Exchange);

    /// Internal diagnostics: dump failures, flaky window announcements.
    fn diagnostic(&self, message: &str);
}

/// Routes exchanges to `info` and diagnostics to `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn exchange(&self, entry: &Exchange) {
        info!(
            request = %entry.request,
            response = entry.response.as_deref().unwrap_or("<nil>"),
            response_body = entry.response_body.as_deref(),
            error = entry.error.as_deref(),
            "http exchange"
        );
    }

    fn diagnostic(&self, message: &str) {
        debug!("{}", message);
    }
}

/// Whether bodies should be captured for this request.
///
/// Only a single `Content-Type: application/octet-stream` turns capture off.
pub fn captures_body(request: &Request) -> bool {
    let mut values = request.headers.get_all(CONTENT_TYPE).iter();
    match (values.next(), values.next()) {
        (Some(only), None) => only.as_bytes() != BINARY_CONTENT_TYPE.as_bytes(),
        _ => true,
    }
}

/// Render a request the way it goes out on the wire.
///
/// The body is included only when `include_body` is set, and only if it is
/// replayable; a one-shot stream cannot be dumped without consuming it.
pub fn dump_request(request: &Request, include_body: bool) -> Result<String, DumpError> {
    let host = request
        .url
        .host_str()
        .ok_or_else(|| DumpError::MissingHost(request.url.to_string()))?;

    let mut target = request.url.path().to_string();
    if let Some(query) = request.url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut dump = format!("{} {} HTTP/1.1\r\n", request.method, target);
    match request.url.port() {
        Some(port) => dump.push_str(&format!("Host: {}:{}\r\n", host, port)),
        None => dump.push_str(&format!("Host: {}\r\n", host)),
    }
    dump.push_str(&render_headers(&request.headers));
    dump.push_str("\r\n");

    if include_body {
        let body = request.body.as_bytes().ok_or(DumpError::StreamingBody)?;
        dump.push_str(&String::from_utf8_lossy(body));
    }

    Ok(dump)
}

/// Logs every exchange that passes through it.
///
/// The outcome of the wrapped transport is never altered. When bodies are
/// captured, streaming request and response bodies are read into memory and
/// handed on as bodies with the same bytes (and the same read error, if any).
pub struct LoggingTransport<T> {
    inner: T,
    sanitizer: Arc<dyn Sanitizer>,
    sink: Arc<dyn LogSink>,
}

impl<T: Transport> LoggingTransport<T> {
    /// Log through `tracing` with the default [`Redactor`].
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            sanitizer: Arc::new(Redactor::default()),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }
}

#[async_trait]
impl<T: Transport> Transport for LoggingTransport<T> {
    async fn round_trip(&self, mut request: Request) -> Result<Response, TransportError> {
        let capture = captures_body(&request);

        if capture && !request.body.is_replayable() {
            let body = std::mem::take(&mut request.body);
            let (bytes, read_err) = body.drain().await;
            request.body = Body::replay(bytes, read_err);
        }

        let dump = match dump_request(&request, capture) {
            Ok(dump) => dump,
            Err(err) => {
                // Logging trouble never fails the request.
                self.sink
                    .diagnostic(&format!("error dumping http request: {}", err));
                match err {
                    DumpError::StreamingBody => {
                        dump_request(&request, false).unwrap_or_default()
                    }
                    DumpError::MissingHost(_) => String::new(),
                }
            }
        };

        let result = self.inner.round_trip(request).await;

        let mut entry = Exchange {
            request: self.sanitizer.sanitize(&dump),
            response: None,
            response_body: None,
            error: None,
        };

        let result = match result {
            Ok(mut response) => {
                entry.response = Some(self.sanitizer.sanitize(&response.metadata()));
                if capture {
                    let body = std::mem::take(&mut response.body);
                    let (bytes, read_err) = body.drain().await;
                    entry.response_body =
                        Some(self.sanitizer.sanitize(&String::from_utf8_lossy(&bytes)));
                    response.body = Body::replay(bytes, read_err);
                }
                Ok(response)
            }
            Err(err) => {
                entry.error = Some(self.sanitizer.sanitize(&err.to_string()));
                Err(err)
            }
        };

        self.sink.exchange(&entry);
        result
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CapturingSink;
    use super::*;
    use crate::error::BoxError;
    use crate::transport::testing::StubTransport;
    use bytes::Bytes;
    use futures::stream;
    use http::header::{HeaderValue, AUTHORIZATION, SET_COOKIE};
    use http::{Method, StatusCode};
    use tokio_test::{assert_err, assert_ok};

    fn logged<T: Transport>(inner: T) -> (LoggingTransport<T>, Arc<CapturingSink>) {
        let sink = Arc::new(CapturingSink::default());
        let transport = LoggingTransport::new(inner).with_sink(sink.clone());
        (transport, sink)
    }

    fn request_with_type(content_type: Option<&'static str>) -> Request {
        let req = Request::get("http://example.com/upload").unwrap();
        match content_type {
            Some(ct) => req.with_header(CONTENT_TYPE, HeaderValue::from_static(ct)),
            None => req,
        }
    }

    #[test]
    fn test_captures_body_rules() {
        assert!(!captures_body(&request_with_type(Some(
            "application/octet-stream"
        ))));
        assert!(captures_body(&request_with_type(None)));
        assert!(captures_body(&request_with_type(Some("application/json"))));

        let both = request_with_type(Some("application/octet-stream"))
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(captures_body(&both));
    }

    #[test]
    fn test_dump_request_format() {
        let req = Request::new(
            Method::POST,
            url::Url::parse("http://example.com:8080/v1/items?a=1").unwrap(),
        )
        .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
        .with_body("hello");

        let dump = dump_request(&req, true).unwrap();
        assert_eq!(
            dump,
            "POST /v1/items?a=1 HTTP/1.1\r\nHost: example.com:8080\r\ncontent-type: text/plain\r\n\r\nhello"
        );

        let without_body = dump_request(&req, false).unwrap();
        assert!(without_body.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_dump_request_rejects_streaming_body() {
        let req = Request::get("http://example.com/")
            .unwrap()
            .with_body(Body::from_stream(stream::iter(vec![Ok::<_, BoxError>(
                Bytes::from_static(b"x"),
            )])));
        assert!(matches!(
            dump_request(&req, true),
            Err(DumpError::StreamingBody)
        ));
        assert_ok!(dump_request(&req, false));
    }

    #[tokio::test]
    async fn test_binary_response_body_is_not_logged() {
        let (transport, sink) = logged(StubTransport::ok("binarydata"));
        let req = request_with_type(Some("application/octet-stream"));

        let resp = transport.round_trip(req).await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("GET /upload HTTP/1.1"));
        assert!(lines[0].contains("200 OK"));
        assert!(!lines[0].contains("binarydata"));

        // The body was never touched and still reaches the caller.
        assert_eq!(resp.body.collect().await.unwrap(), Bytes::from("binarydata"));
    }

    #[tokio::test]
    async fn test_text_response_body_is_logged_and_replayed() {
        for content_type in [None, Some("application/json")] {
            let (transport, sink) = logged(StubTransport::ok("{\"ok\":true}"));
            let resp = transport
                .round_trip(request_with_type(content_type))
                .await
                .unwrap();

            assert!(resp.body.is_replayable());
            assert_eq!(resp.status, StatusCode::OK);
            assert_eq!(resp.status_text, "200 OK");
            assert_eq!(
                resp.body.as_bytes().map(|b| b.to_vec()),
                Some(b"{\"ok\":true}".to_vec())
            );

            let entry = sink.exchanges.lock().unwrap()[0].clone();
            assert_eq!(entry.response_body.as_deref(), Some("{\"ok\":true}"));
            assert!(sink.lines()[0].contains("response body: {\"ok\":true}"));
        }
    }

    #[tokio::test]
    async fn test_streaming_response_body_is_replaced() {
        let (transport, sink) = logged(StubTransport::new(|_| {
            let chunks = vec![
                Ok::<_, BoxError>(Bytes::from_static(b"chunk-1 ")),
                Ok(Bytes::from_static(b"chunk-2")),
            ];
            Ok(Response::new(
                StatusCode::OK,
                Body::from_stream(stream::iter(chunks)),
            ))
        }));

        let resp = transport
            .round_trip(request_with_type(None))
            .await
            .unwrap();
        assert_eq!(
            resp.body.collect().await.unwrap(),
            Bytes::from("chunk-1 chunk-2")
        );
        assert!(sink.lines()[0].contains("response body: chunk-1 chunk-2"));
    }

    #[tokio::test]
    async fn test_response_body_read_error_is_preserved() {
        let (transport, _sink) = logged(StubTransport::new(|_| {
            let chunks = vec![
                Ok::<_, BoxError>(Bytes::from_static(b"partial")),
                Err("connection reset".into()),
            ];
            Ok(Response::new(
                StatusCode::OK,
                Body::from_stream(stream::iter(chunks)),
            ))
        }));

        let resp = transport
            .round_trip(request_with_type(None))
            .await
            .unwrap();
        let (bytes, err) = resp.body.drain().await;
        assert_eq!(bytes, Bytes::from("partial"));
        assert_eq!(err.unwrap().to_string(), "connection reset");
    }

    #[tokio::test]
    async fn test_delegate_error_is_returned_verbatim() {
        let (transport, sink) = logged(StubTransport::failing("dial tcp: refused"));
        let result = transport.round_trip(request_with_type(None)).await;

        let err = assert_err!(result);
        assert!(matches!(err, TransportError::Failed(ref m) if m == "dial tcp: refused"));

        let entry = sink.exchanges.lock().unwrap()[0].clone();
        assert_eq!(entry.response, None);
        assert_eq!(entry.response_body, None);
        assert_eq!(entry.error.as_deref(), Some("dial tcp: refused"));
        assert!(sink.lines()[0].contains("--->response: <nil>"));
    }

    #[tokio::test]
    async fn test_headers_and_status_unchanged() {
        let (transport, _sink) = logged(StubTransport::new(|_| {
            Ok(Response::new(StatusCode::NOT_FOUND, "missing")
                .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain")))
        }));

        let resp = transport
            .round_trip(request_with_type(None))
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.status_text, "404 Not Found");
        assert_eq!(resp.headers.get(CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[tokio::test]
    async fn test_streaming_request_body_is_dumped_and_forwarded() {
        let stub = Arc::new(StubTransport::ok("fine"));
        let (transport, sink) = logged(stub.clone());
        let req = Request::new(Method::PUT, url::Url::parse("http://example.com/up").unwrap())
            .with_body(Body::from_stream(stream::iter(vec![
                Ok::<_, BoxError>(Bytes::from_static(b"part-1 ")),
                Ok(Bytes::from_static(b"part-2")),
            ])));

        assert_ok!(transport.round_trip(req).await);

        assert!(sink.diagnostics().is_empty());
        let line = &sink.lines()[0];
        assert!(line.starts_with(
            "http request: PUT /up HTTP/1.1\r\nHost: example.com\r\n"
        ));
        assert!(line.contains("\r\n\r\npart-1 part-2--->response: 200 OK"));
        assert_eq!(stub.bodies(), vec![Bytes::from("part-1 part-2")]);
    }

    #[tokio::test]
    async fn test_unreadable_request_body_keeps_request_line() {
        let (transport, sink) = logged(StubTransport::ok("fine"));
        let req = Request::new(Method::PUT, url::Url::parse("http://example.com/up").unwrap())
            .with_body(Body::from_stream(stream::iter(vec![
                Ok::<_, BoxError>(Bytes::from_static(b"partial")),
                Err("upload aborted".into()),
            ])));

        assert_ok!(transport.round_trip(req).await);

        let diagnostics = sink.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].starts_with("error dumping http request"));
        let line = &sink.lines()[0];
        assert!(line.starts_with(
            "http request: PUT /up HTTP/1.1\r\nHost: example.com\r\n\r\n--->response: 200 OK"
        ));
        assert!(!line.contains("partial"));
    }

    #[tokio::test]
    async fn test_binary_streaming_request_body_is_left_alone() {
        let (transport, sink) = logged(StubTransport::ok("fine"));
        let req = request_with_type(Some("application/octet-stream")).with_body(
            Body::from_stream(stream::iter(vec![Ok::<_, BoxError>(Bytes::from_static(
                b"\x00\x01",
            ))])),
        );

        assert_ok!(transport.round_trip(req).await);
        assert!(sink.diagnostics().is_empty());
        assert!(sink.lines()[0].contains("GET /upload HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_response_credential_headers_are_masked() {
        let (transport, sink) = logged(StubTransport::new(|_| {
            Ok(Response::new(StatusCode::OK, "ok")
                .with_header(SET_COOKIE, HeaderValue::from_static("session=TOPSECRET"))
                .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain")))
        }));

        let resp = transport
            .round_trip(request_with_type(None))
            .await
            .unwrap();
        assert_eq!(resp.headers.get(SET_COOKIE).unwrap(), "session=TOPSECRET");

        let line = &sink.lines()[0];
        assert!(line.contains("set-cookie: REDACTED"));
        assert!(line.contains("content-type: text/plain"));
        assert!(!line.contains("TOPSECRET"));
    }

    #[tokio::test]
    async fn test_logged_text_is_sanitized() {
        let (transport, sink) = logged(StubTransport::new(|_| {
            Ok(Response::new(StatusCode::OK, "token=abc123"))
        }));
        let req = Request::get("http://example.com/v1?key=SECRET")
            .unwrap()
            .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));

        transport.round_trip(req).await.unwrap();

        let line = &sink.lines()[0];
        assert!(line.contains("/v1?key=REDACTED"));
        assert!(line.contains("authorization: REDACTED"));
        assert!(line.contains("response body: token=REDACTED"));
        assert!(!line.contains("SECRET"));
        assert!(!line.contains("xyz"));
        assert!(!line.contains("abc123"));
    }
}
