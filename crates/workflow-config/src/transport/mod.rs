//! The seam between the configuration API and the HTTP stack.
//!
//! The client only builds requests and interprets responses. Connection
//! handling, TLS, authentication headers and timeouts belong to a
//! [`Transport`]. [`HyperTransport`] is the default implementation, tests use
//! the in-memory [`MockController`](crate::mock::MockController).
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::combinators::BoxBody;
use snafu::Snafu;

mod http_client;

pub use http_client::*;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The body of a response handed out by a [`Transport`].
///
/// The client always collects the whole body before it looks at the status
/// code, which hands the connection back to the transport's pool.
pub type ResponseBody = BoxBody<Bytes, BoxError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TransportError {
    #[snafu(display("failed to build request for {uri}"))]
    BuildRequest { source: http::Error, uri: String },

    #[snafu(display("failed to send request to the controller"))]
    SendRequest { source: BoxError },

    #[snafu(display("failed to read response body"))]
    ReadBody { source: BoxError },

    #[snafu(display("request timed out after {}", humantime::format_duration(*timeout)))]
    TimedOut { timeout: Duration },
}

/// Sends a single request to the controller and returns its response.
///
/// Implementations must not retry on their own and must not interpret the
/// status code, every response is handed back to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<ResponseBody>, TransportError>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(
        &self,
        request: Request<Bytes>,
    ) -> Result<Response<ResponseBody>, TransportError> {
        (**self).send(request).await
    }
}
