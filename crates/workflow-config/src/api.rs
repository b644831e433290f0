//! The two operations of the configuration API.
use http::Method;
use snafu::ResultExt;
use tracing::instrument;

use crate::{
    app::AppId,
    client::Client,
    config::{ConfigPatch, Configuration},
    error::{DecodeSnafu, EncodeSnafu, Error},
    transport::Transport,
};

impl<T> Client<T>
where
    T: Transport,
{
    /// Returns the current configuration of `app`.
    ///
    /// This is a plain read, calling it has no effect on the application.
    #[instrument(skip(self, app), fields(app = %app))]
    pub async fn list_config(&self, app: &AppId) -> Result<Configuration, Error> {
        let body = self.execute(Method::GET, app, None).await?;
        serde_json::from_slice(&body).context(DecodeSnafu { app: app.clone() })
    }

    /// Applies `patch` to the configuration of `app` and returns the merged
    /// configuration.
    ///
    /// Keys missing from the patch are left unchanged, set keys are added or
    /// overwritten and unset keys are removed. The controller creates a new
    /// release for every successful call, even if the resulting configuration
    /// equals the previous one.
    ///
    /// The controller rejects
    ///
    /// - an empty patch with [`Error::Conflict`],
    /// - unsetting a key that does not exist with [`Error::Unprocessable`],
    /// - tags no cluster node carries with [`Error::TagNotFound`].
    #[instrument(skip(self, app, patch), fields(app = %app))]
    pub async fn set_config(
        &self,
        app: &AppId,
        patch: &ConfigPatch,
    ) -> Result<Configuration, Error> {
        let request_body =
            serde_json::to_vec(patch).context(EncodeSnafu { app: app.clone() })?;

        let body = self.execute(Method::POST, app, Some(request_body)).await?;
        let config: Configuration =
            serde_json::from_slice(&body).context(DecodeSnafu { app: app.clone() })?;

        tracing::info!(uuid = config.uuid.as_deref(), "applied configuration patch");
        Ok(config)
    }
}
