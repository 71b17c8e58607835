//! Terminal transport that performs real network I/O through `reqwest`.

use crate::body::Body;
use crate::config::Settings;
use crate::error::{BoxError, TransportError};
use crate::message::{status_text, Request, Response};
use crate::transport::Transport;
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tracing::debug;

/// Sends requests with a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client from the global settings.
    pub fn new(settings: &Settings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn round_trip(&self, request: Request) -> Result<Response, TransportError> {
        let head = request.head();
        let Request {
            method,
            url,
            headers,
            body,
        } = request;

        // Streaming request bodies are buffered so reqwest can size them.
        let body = body.collect().await.map_err(TransportError::Body)?;

        let mut builder = self.client.request(method, url).headers(headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let reply = builder.send().await?;
        debug!(status = reply.status().as_u16(), url = %head.url.path(), "Upstream replied");

        let status = reply.status();
        let version = reply.version();
        let headers = reply.headers().clone();
        let body = Body::from_stream(
            reply
                .bytes_stream()
                .map(|chunk| chunk.map_err(|err| Box::new(err) as BoxError)),
        );

        Ok(Response {
            status,
            status_text: status_text(status),
            version,
            headers,
            body,
            request: Some(head),
        })
    }
}
