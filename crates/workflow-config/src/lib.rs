//! A client for the application configuration API of the Workflow controller.
//!
//! The controller keeps a [`Configuration`] per application: environment
//! variables, resource limits, tags and registry settings. This crate reads it
//! with [`Client::list_config`] and changes it with [`Client::set_config`],
//! which submits a [`ConfigPatch`] and creates a new release of the
//! application.
//!
//! ```no_run
//! use workflow_config::{AppId, Client, ClientSettings, ConfigPatch, HyperTransport};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ClientSettings::new("http://deis.example.com".parse()?)?;
//! let client = Client::new(HyperTransport::default(), settings);
//! let app: AppId = "billing".parse()?;
//!
//! let patch = ConfigPatch::new().unset("DEBUG").set("WORKERS", "4");
//! let config = client.set_config(&app, &patch).await?;
//! println!("{:?}", config.values);
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Features
//!
//! - `clap` (default) enables [`cli::ControllerOptions`] for clap-based CLIs.

mod api;
pub mod app;
#[cfg(feature = "clap")]
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod mock;
pub mod transport;

pub use app::{AppId, AppIdError};
pub use client::{Client, ClientSettings, SettingsError};
pub use config::{ConfigPatch, Configuration, PatchValue, Section};
pub use error::{Error, ErrorKind};
pub use transport::{HyperTransport, Transport};
