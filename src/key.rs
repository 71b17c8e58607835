//! Authentication key injection.

use crate::error::TransportError;
use crate::message::{Request, Response};
use crate::transport::Transport;
use async_trait::async_trait;

/// Query parameter name used when none is configured.
pub const DEFAULT_KEY_PARAM: &str = "key";

/// Appends `<param>=<key>` to the query string of every request.
pub struct KeyInjectingTransport<T> {
    inner: T,
    key: String,
    param: String,
}

impl<T: Transport> KeyInjectingTransport<T> {
    pub fn new(inner: T, key: impl Into<String>) -> Self {
        Self {
            inner,
            key: key.into(),
            param: DEFAULT_KEY_PARAM.to_string(),
        }
    }

    /// Use a parameter name other than `key`.
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    fn inject(&self, request: &mut Request) {
        let mut query = request.url.query().unwrap_or_default().to_string();
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&self.param);
        query.push('=');
        query.push_str(&self.key);
        request.url.set_query(Some(&query));
    }
}

#[async_trait]
impl<T: Transport> Transport for KeyInjectingTransport<T> {
    async fn round_trip(&self, mut request: Request) -> Result<Response, TransportError> {
        self.inject(&mut request);
        self.inner.round_trip(request).await
    }
}
