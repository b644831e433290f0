//! An in-memory stand-in for the controller.
//!
//! [`MockController`] implements [`Transport`] and answers the configuration
//! API the way the controller does: it merges patches with
//! [`Configuration::apply_patch`], records a [`Release`] for every successful
//! patch and maps rejected patches to the controller's status codes. Use it to
//! test code built on top of [`Client`](crate::Client) without a cluster.
//!
//! ```
//! # use std::sync::Arc;
//! # use workflow_config::{AppId, Client, ClientSettings, ConfigPatch, mock::MockController};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let app = AppId::try_from("billing").unwrap();
//! let controller = Arc::new(MockController::new());
//! controller.create_app(&app);
//!
//! let settings = ClientSettings::new("http://controller.test".parse().unwrap()).unwrap();
//! let client = Client::new(controller.clone(), settings);
//!
//! let config = client.set_config(&app, &ConfigPatch::new().set("WORKERS", "4")).await.unwrap();
//! assert_eq!(config.values["WORKERS"], "4");
//! assert_eq!(controller.releases(&app).len(), 2);
//! # }
//! ```
use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::json;

use crate::{
    app::AppId,
    client::API_VERSION_HEADER,
    config::{ClusterLabels, ConfigPatch, Configuration, MergeError},
    transport::{ResponseBody, Transport, TransportError},
};

/// The API version the mock controller reports.
pub const MOCK_API_VERSION: &str = "2.3";

/// A release recorded by the [`MockController`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Release {
    pub version: u64,
    pub summary: String,
    pub config: Configuration,
}

#[derive(Debug, Default)]
struct AppState {
    config: Configuration,
    releases: Vec<Release>,
}

#[derive(Debug, Default)]
struct State {
    apps: BTreeMap<AppId, AppState>,
    cluster: ClusterLabels,
    canned: VecDeque<(StatusCode, Bytes)>,
    requests: Vec<(Method, String)>,
}

/// An in-memory controller serving `/v2/apps/{app}/config/`.
#[derive(Debug, Default)]
pub struct MockController {
    state: Mutex<State>,
}

impl MockController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `app` with an empty configuration and its initial release.
    pub fn create_app(&self, app: &AppId) {
        self.create_app_with(app, Configuration::default());
    }

    /// Creates `app` with the given configuration and its initial release.
    pub fn create_app_with(&self, app: &AppId, mut config: Configuration) {
        let now = jiff::Timestamp::now().to_string();
        config.app.get_or_insert_with(|| app.to_string());
        config.owner.get_or_insert_with(|| "admin".to_owned());
        config.created.get_or_insert_with(|| now.clone());
        config.updated.get_or_insert(now);

        let mut state = self.lock();
        let app_state = state.apps.entry(app.clone()).or_default();
        app_state.config = config.clone();
        app_state.releases = vec![Release {
            version: 1,
            summary: format!(
                "{} created initial release",
                config.owner.as_deref().unwrap_or_default()
            ),
            config,
        }];
    }

    /// Adds a cluster node carrying `labels`, which tags can then refer to.
    pub fn add_node<K, V>(&self, labels: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.lock().cluster.add_node(labels);
    }

    /// Answers the next request with `status` and `body`, regardless of the
    /// request. Canned responses are used up in the order they were added.
    pub fn respond_once_with(&self, status: StatusCode, body: impl Into<Bytes>) {
        self.lock().canned.push_back((status, body.into()));
    }

    /// Returns the current configuration of `app`, if it exists.
    pub fn config(&self, app: &AppId) -> Option<Configuration> {
        self.lock().apps.get(app).map(|state| state.config.clone())
    }

    /// Returns all releases of `app`, oldest first.
    pub fn releases(&self, app: &AppId) -> Vec<Release> {
        self.lock()
            .apps
            .get(app)
            .map(|state| state.releases.clone())
            .unwrap_or_default()
    }

    /// Returns method and path of every request received so far.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, request: &Request<Bytes>) -> (StatusCode, Bytes) {
        let mut state = self.lock();
        state
            .requests
            .push((request.method().clone(), request.uri().path().to_owned()));

        if let Some(canned) = state.canned.pop_front() {
            return canned;
        }

        let Some(app) = parse_config_path(request.uri().path()) else {
            return detail(StatusCode::NOT_FOUND, "Not found.");
        };

        let State { apps, cluster, .. } = &mut *state;
        let Some(app_state) = apps.get_mut(&app) else {
            return detail(StatusCode::NOT_FOUND, "Not found.");
        };

        match *request.method() {
            Method::GET => to_json(StatusCode::OK, &app_state.config),
            Method::POST => {
                let patch: ConfigPatch = match serde_json::from_slice(request.body()) {
                    Ok(patch) => patch,
                    Err(err) => return detail(StatusCode::BAD_REQUEST, &err.to_string()),
                };

                match app_state.config.apply_patch(&patch, cluster) {
                    Ok(mut merged) => {
                        merged.updated = Some(jiff::Timestamp::now().to_string());

                        let version = app_state.releases.last().map_or(1, |r| r.version + 1);
                        app_state.releases.push(Release {
                            version,
                            summary: format!(
                                "{} changed configuration",
                                merged.owner.as_deref().unwrap_or_default()
                            ),
                            config: merged.clone(),
                        });
                        app_state.config = merged;

                        to_json(StatusCode::CREATED, &app_state.config)
                    }
                    Err(err @ MergeError::EmptyPatch) => {
                        detail(StatusCode::CONFLICT, &err.to_string())
                    }
                    Err(err) => detail(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string()),
                }
            }
            _ => detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed."),
        }
    }
}

#[async_trait]
impl Transport for MockController {
    async fn send(
        &self,
        request: Request<Bytes>,
    ) -> Result<Response<ResponseBody>, TransportError> {
        let (status, body) = self.handle(&request);

        let mut response = Response::new(Full::new(body).map_err(|never| match never {}).boxed());
        *response.status_mut() = status;
        response.headers_mut().insert(
            API_VERSION_HEADER,
            http::HeaderValue::from_static(MOCK_API_VERSION),
        );

        Ok(response)
    }
}

/// Extracts the app from `/v2/apps/{app}/config/`.
fn parse_config_path(path: &str) -> Option<AppId> {
    let app = path.strip_prefix("/v2/apps/")?.strip_suffix("/config/")?;
    app.parse().ok()
}

fn detail(status: StatusCode, message: &str) -> (StatusCode, Bytes) {
    (status, Bytes::from(json!({ "detail": message }).to_string()))
}

fn to_json(status: StatusCode, config: &Configuration) -> (StatusCode, Bytes) {
    match serde_json::to_vec(config) {
        Ok(body) => (status, Bytes::from(body)),
        Err(err) => detail(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}
