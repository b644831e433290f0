//! Command line options for tools talking to the controller.
//!
//! Embed [`ControllerOptions`] into the arguments of a clap-based CLI:
//!
//! ```
//! use clap::Parser;
//! use workflow_config::cli::ControllerOptions;
//!
//! #[derive(Parser)]
//! struct Opts {
//!     /// The application to inspect.
//!     app: String,
//!
//!     #[command(flatten)]
//!     controller: ControllerOptions,
//! }
//!
//! let opts = Opts::parse_from([
//!     "config-tool",
//!     "billing",
//!     "--controller-url",
//!     "http://deis.example.com",
//! ]);
//! let client = opts.controller.client().unwrap();
//! assert_eq!(client.settings().base_url().as_str(), "http://deis.example.com/");
//! ```
use std::time::Duration;

use clap::Args;
use url::Url;

use crate::{
    client::{Client, ClientSettings, SettingsError},
    transport::HyperTransport,
};

/// Options to reach the controller.
#[derive(Clone, Debug, PartialEq, Eq, Args)]
#[command(next_help_heading = "Controller Options")]
pub struct ControllerOptions {
    /// Base URL of the Workflow controller, e.g. `https://deis.example.com`.
    #[arg(long, env = "WORKFLOW_CONTROLLER_URL")]
    pub controller_url: Url,

    /// Controller API version this tool expects. A mismatch is logged as a
    /// warning.
    #[arg(long, env = "WORKFLOW_CONTROLLER_API_VERSION")]
    pub controller_api_version: Option<String>,

    /// Time limit for a single request, including reading the response.
    #[arg(
        long,
        env = "WORKFLOW_REQUEST_TIMEOUT",
        default_value = "30s",
        value_parser = humantime::parse_duration
    )]
    pub request_timeout: Duration,
}

impl ControllerOptions {
    pub fn settings(&self) -> Result<ClientSettings, SettingsError> {
        let settings = ClientSettings::new(self.controller_url.clone())?;

        Ok(match &self.controller_api_version {
            Some(api_version) => settings.with_api_version(api_version),
            None => settings,
        })
    }

    /// Builds a client using a [`HyperTransport`] with the configured timeout.
    pub fn client(&self) -> Result<Client<HyperTransport>, SettingsError> {
        let settings = self.settings()?;
        Ok(Client::new(HyperTransport::new(self.request_timeout), settings))
    }
}
