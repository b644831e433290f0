//! Application configuration as held by the controller.
//!
//! The controller stores one [`Configuration`] per application. It is never
//! edited in place: callers describe the desired change as a [`ConfigPatch`],
//! submit it, and receive a fresh snapshot back. Every section of the patch is
//! a map from key to [`PatchValue`]:
//!
//! - a key that is not in the map is left unchanged,
//! - [`PatchValue::Set`] sets or overwrites the key,
//! - [`PatchValue::Unset`] removes the key. Removing a key which is not present
//!   is rejected.
//!
//! The controller performs the merge. [`Configuration::apply_patch`] models the
//! same rules locally and backs the [`MockController`](crate::mock::MockController).
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter};

mod merge;
mod patch;
pub mod tag;

pub use merge::*;
pub use patch::*;

/// Values of one configuration section, keyed by name.
pub type ConfigSection = BTreeMap<String, Value>;

/// The sections of a [`Configuration`] which can be patched.
#[derive(Clone, Copy, Debug, Display, EnumIter, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum Section {
    /// Environment variables of the application.
    Values,

    /// Memory limits per process type.
    Memory,

    /// CPU limits per process type.
    Cpu,

    /// Node label constraints.
    Tags,

    /// Private registry settings.
    Registry,
}

/// A configuration snapshot of one application, as returned by the controller.
///
/// Metadata fields like `owner`, `created` or `uuid` are carried as opaque
/// values. Fields this type does not know about are kept in [`Self::extra`]
/// and serialized back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    #[serde(default)]
    pub values: ConfigSection,

    #[serde(default)]
    pub memory: ConfigSection,

    #[serde(default)]
    pub cpu: ConfigSection,

    #[serde(default)]
    pub tags: ConfigSection,

    #[serde(default)]
    pub registry: ConfigSection,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Configuration {
    pub fn section(&self, section: Section) -> &ConfigSection {
        match section {
            Section::Values => &self.values,
            Section::Memory => &self.memory,
            Section::Cpu => &self.cpu,
            Section::Tags => &self.tags,
            Section::Registry => &self.registry,
        }
    }

    fn section_mut(&mut self, section: Section) -> &mut ConfigSection {
        match section {
            Section::Values => &mut self.values,
            Section::Memory => &mut self.memory,
            Section::Cpu => &mut self.cpu,
            Section::Tags => &mut self.tags,
            Section::Registry => &mut self.registry,
        }
    }
}
