use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Request, Response};
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use snafu::{OptionExt, ResultExt};

use crate::transport::{
    BoxError, ReadBodySnafu, ResponseBody, SendRequestSnafu, TimedOutSnafu, Transport,
    TransportError,
};

/// A [`Transport`] backed by a pooled `hyper` client.
///
/// Requests are sent as-is, apart from the [default headers](Self::with_default_headers)
/// which are added when the request does not carry them already. The timeout
/// covers sending the request and reading the complete response body.
///
/// Both `http` and `https` controller URLs are supported. TLS is provided by
/// rustls, server certificates are verified against the webpki root store.
#[derive(Clone, Debug)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    default_headers: HeaderMap,
    timeout: Duration,
}

impl HyperTransport {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(timeout: Duration) -> Self {
        // The HTTPS connector checks the scheme itself.
        let mut http = HttpConnector::new();
        http.enforce_http(false);

        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            default_headers: HeaderMap::new(),
            timeout,
        }
    }

    /// Adds headers to every request, for example the `Authorization` header
    /// of the chosen authentication scheme.
    pub fn with_default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers.extend(headers);
        self
    }

    async fn send_and_collect(
        &self,
        request: Request<Bytes>,
    ) -> Result<Response<ResponseBody>, TransportError> {
        let response = self
            .client
            .request(request.map(Full::new))
            .await
            .map_err(|err| Box::new(err) as BoxError)
            .context(SendRequestSnafu)?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|err| Box::new(err) as BoxError)
            .context(ReadBodySnafu)?
            .to_bytes();

        let body = Full::new(body).map_err(|never| match never {}).boxed();
        Ok(Response::from_parts(parts, body))
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(
        &self,
        mut request: Request<Bytes>,
    ) -> Result<Response<ResponseBody>, TransportError> {
        for (name, value) in &self.default_headers {
            if !request.headers().contains_key(name) {
                request.headers_mut().insert(name.clone(), value.clone());
            }
        }

        tokio::time::timeout(self.timeout, self.send_and_collect(request))
            .await
            .ok()
            .context(TimedOutSnafu {
                timeout: self.timeout,
            })?
    }
}
