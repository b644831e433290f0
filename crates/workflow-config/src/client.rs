use bytes::Bytes;
use http::{
    HeaderMap, HeaderValue, Method, Request,
    header::{ACCEPT, CONTENT_TYPE, USER_AGENT},
};
use http_body_util::BodyExt;
use snafu::{ResultExt, Snafu, ensure};
use url::Url;

use crate::{
    app::AppId,
    error::{Error, TransportSnafu},
    transport::{BuildRequestSnafu, HyperTransport, ReadBodySnafu, Transport},
};

/// The response header carrying the API version of the controller.
pub const API_VERSION_HEADER: &str = "deis_api_version";

const DEFAULT_USER_AGENT: &str = concat!("workflow-config/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum SettingsError {
    #[snafu(display("controller URL {url} cannot be used as a base URL"))]
    CannotBeABase { url: Url },

    #[snafu(display("controller URL {url} must use http or https"))]
    UnsupportedScheme { url: Url },
}

/// Settings shared by all requests of a [`Client`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSettings {
    base_url: Url,
    api_version: Option<String>,
    user_agent: String,
}

impl ClientSettings {
    /// Creates settings for the controller reachable at `base_url`, e.g.
    /// `http://deis.example.com`. A path prefix is kept, API paths are
    /// appended to it.
    pub fn new(base_url: Url) -> Result<Self, SettingsError> {
        ensure!(
            matches!(base_url.scheme(), "http" | "https"),
            UnsupportedSchemeSnafu { url: base_url }
        );
        ensure!(
            !base_url.cannot_be_a_base(),
            CannotBeABaseSnafu { url: base_url }
        );

        Ok(Self {
            base_url,
            api_version: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        })
    }

    /// Sets the controller API version this client was built against. A
    /// controller reporting a different version is logged as a warning.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the URL of the configuration resource of `app`.
    pub fn config_url(&self, app: &AppId) -> Url {
        let mut url = self.base_url.clone();

        // Checked in `new`, a base URL always has path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v2", "apps", &**app, "config", ""]);
        }

        url
    }
}

/// A client for the configuration API of the controller.
///
/// The client owns no connection state itself, everything goes through the
/// [`Transport`]. It is cheap to share between tasks; calls for different
/// applications do not interact.
#[derive(Clone, Debug)]
pub struct Client<T = HyperTransport> {
    transport: T,
    settings: ClientSettings,
}

impl<T> Client<T>
where
    T: Transport,
{
    pub fn new(transport: T, settings: ClientSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends a request for the configuration resource of `app` and returns the
    /// body of a successful response.
    ///
    /// The body is read completely before the status is looked at, so the
    /// underlying connection is released on success and on failure alike.
    pub(crate) async fn execute(
        &self,
        method: Method,
        app: &AppId,
        body: Option<Vec<u8>>,
    ) -> Result<Bytes, Error> {
        let request = self.build_request(method, app, body)?;
        tracing::debug!(
            method = %request.method(),
            uri = %request.uri(),
            "sending request to controller"
        );

        let response = self.transport.send(request).await.context(TransportSnafu)?;
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .context(ReadBodySnafu)
            .context(TransportSnafu)?
            .to_bytes();

        tracing::debug!(status = %parts.status, "received response from controller");
        self.check_api_version(&parts.headers);

        if parts.status.is_success() {
            Ok(body)
        } else {
            Err(Error::from_response(app, parts.status, &body))
        }
    }

    fn build_request(
        &self,
        method: Method,
        app: &AppId,
        body: Option<Vec<u8>>,
    ) -> Result<Request<Bytes>, Error> {
        let uri = self.settings.config_url(app);

        let mut builder = Request::builder()
            .method(method)
            .uri(uri.as_str())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.settings.user_agent);

        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }

        builder
            .body(body.map(Bytes::from).unwrap_or_default())
            .context(BuildRequestSnafu { uri: uri.to_string() })
            .context(TransportSnafu)
    }

    fn check_api_version(&self, headers: &HeaderMap) {
        let Some(expected) = &self.settings.api_version else {
            return;
        };

        match headers.get(API_VERSION_HEADER).map(HeaderValue::to_str) {
            Some(Ok(actual)) if actual != expected.as_str() => tracing::warn!(
                expected,
                actual,
                "controller API version differs from the version this client expects"
            ),
            Some(Err(_)) => tracing::warn!("controller sent a non-ASCII API version header"),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;
    use http::Response;
    use http_body_util::Full;
    use rstest::rstest;

    use super::*;
    use crate::transport::{ResponseBody, TransportError};

    /// Answers every request with an empty configuration and, if set, the
    /// given API version header.
    struct VersionedController(Option<HeaderValue>);

    #[async_trait]
    impl Transport for VersionedController {
        async fn send(
            &self,
            _request: Request<Bytes>,
        ) -> Result<Response<ResponseBody>, TransportError> {
            let body = Full::new(Bytes::from_static(b"{}"))
                .map_err(|never| match never {})
                .boxed();
            let mut response = Response::new(body);
            if let Some(version) = &self.0 {
                response
                    .headers_mut()
                    .insert(API_VERSION_HEADER, version.clone());
            }

            Ok(response)
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[rstest]
    #[case::not_configured(None, Some(HeaderValue::from_static("2.4")), None)]
    #[case::matching(Some("2.3"), Some(HeaderValue::from_static("2.3")), None)]
    #[case::header_missing(Some("2.3"), None, None)]
    #[case::mismatch(
        Some("2.3"),
        Some(HeaderValue::from_static("2.4")),
        Some("controller API version differs")
    )]
    #[case::non_ascii(
        Some("2.3"),
        Some(HeaderValue::from_bytes(b"2.\xff").unwrap()),
        Some("non-ASCII API version header")
    )]
    #[tokio::test]
    async fn api_version_warning(
        #[case] expected: Option<&'static str>,
        #[case] reported: Option<HeaderValue>,
        #[case] warning: Option<&'static str>,
    ) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut settings = ClientSettings::new(Url::parse("http://example.com").unwrap()).unwrap();
        if let Some(expected) = expected {
            settings = settings.with_api_version(expected);
        }
        let client = Client::new(VersionedController(reported), settings);
        let app = AppId::try_from("billing").unwrap();

        // A mismatch never fails the call.
        client.list_config(&app).await.unwrap();

        let logs = logs.contents();
        match warning {
            Some(warning) => {
                assert!(logs.contains("WARN"), "{logs}");
                assert!(logs.contains(warning), "{logs}");
            }
            None => assert!(!logs.contains("WARN"), "{logs}"),
        }
    }

    #[rstest]
    #[case("http://deis.example.com", "http://deis.example.com/v2/apps/billing/config/")]
    #[case("http://deis.example.com/", "http://deis.example.com/v2/apps/billing/config/")]
    #[case(
        "https://example.com/controller",
        "https://example.com/controller/v2/apps/billing/config/"
    )]
    #[case(
        "https://example.com/controller/",
        "https://example.com/controller/v2/apps/billing/config/"
    )]
    fn config_url(#[case] base: &str, #[case] expected: &str) {
        let settings = ClientSettings::new(Url::parse(base).unwrap()).unwrap();
        let app = AppId::try_from("billing").unwrap();

        assert_eq!(settings.config_url(&app).as_str(), expected);
    }

    #[rstest]
    #[case("mailto:ops@example.com")]
    #[case("ftp://example.com")]
    fn rejects_unusable_base_url(#[case] base: &str) {
        ClientSettings::new(Url::parse(base).unwrap()).unwrap_err();
    }

    #[test]
    fn default_user_agent_carries_version() {
        let settings = ClientSettings::new(Url::parse("http://example.com").unwrap()).unwrap();
        assert!(settings.user_agent.starts_with("workflow-config/"));
    }
}
