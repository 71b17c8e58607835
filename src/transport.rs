//! The transport capability every layer of the chain implements.

use crate::error::TransportError;
use crate::message::{Request, Response};
use async_trait::async_trait;
use std::sync::Arc;

/// Sends one request and yields one response or one error.
///
/// Decorators wrap another `Transport` and decide whether, and how, to call
/// it. The only suspension points in a chain are the ones inside the
/// innermost transport that performs real I/O.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, request: Request) -> Result<Response, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn round_trip(&self, request: Request) -> Result<Response, TransportError> {
        (**self).round_trip(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn round_trip(&self, request: Request) -> Result<Response, TransportError> {
        (**self).round_trip(request).await
    }
}
