use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::{
    Section,
    tag::{TagError, validate_tag_key, validate_tag_value},
};

/// The change requested for a single key of a [`ConfigPatch`].
///
/// A key which should stay unchanged is simply not part of the patch. This
/// keeps "leave alone" and "remove" apart, which a nullable value cannot do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchValue<V = String> {
    /// Set the key, overwriting any previous value.
    Set(V),

    /// Remove the key. Encoded as JSON `null` on the wire.
    Unset,
}

impl<V> PatchValue<V> {
    pub fn as_set(&self) -> Option<&V> {
        match self {
            Self::Set(value) => Some(value),
            Self::Unset => None,
        }
    }
}

impl<V: Serialize> Serialize for PatchValue<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Set(value) => value.serialize(serializer),
            Self::Unset => serializer.serialize_none(),
        }
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for PatchValue<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<V>::deserialize(deserializer)?.map_or(Self::Unset, Self::Set))
    }
}

/// Requested changes to one section, keyed by name.
pub type PatchSection = BTreeMap<String, PatchValue>;

/// A partial configuration document submitted to the controller.
///
/// ```
/// # use workflow_config::ConfigPatch;
/// let patch = ConfigPatch::new()
///     .unset("DEBUG")
///     .set("WORKERS", "4");
///
/// assert_eq!(
///     serde_json::to_string(&patch).unwrap(),
///     r#"{"values":{"DEBUG":null,"WORKERS":"4"}}"#
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub values: PatchSection,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub memory: PatchSection,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub cpu: PatchSection,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: PatchSection,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub registry: PatchSection,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the environment variable `key` to `value`.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), PatchValue::Set(value.into()));
        self
    }

    /// Removes the environment variable `key`.
    pub fn unset(mut self, key: impl Into<String>) -> Self {
        self.values.insert(key.into(), PatchValue::Unset);
        self
    }

    /// Sets the memory limit of `process_type`, e.g. `web` to `512M`.
    pub fn set_memory(mut self, process_type: impl Into<String>, limit: impl Into<String>) -> Self {
        self.memory.insert(process_type.into(), PatchValue::Set(limit.into()));
        self
    }

    pub fn unset_memory(mut self, process_type: impl Into<String>) -> Self {
        self.memory.insert(process_type.into(), PatchValue::Unset);
        self
    }

    /// Sets the CPU limit of `process_type`, e.g. `web` to `500m`.
    pub fn set_cpu(mut self, process_type: impl Into<String>, limit: impl Into<String>) -> Self {
        self.cpu.insert(process_type.into(), PatchValue::Set(limit.into()));
        self
    }

    pub fn unset_cpu(mut self, process_type: impl Into<String>) -> Self {
        self.cpu.insert(process_type.into(), PatchValue::Unset);
        self
    }

    /// Constrains the application to nodes labeled `key=value`.
    ///
    /// The key and value must be valid Kubernetes label parts. Whether a
    /// matching node exists is only known to the controller.
    pub fn set_tag(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, TagError> {
        let (key, value) = (key.into(), value.into());
        validate_tag_key(&key)?;
        validate_tag_value(&value)?;

        self.tags.insert(key, PatchValue::Set(value));
        Ok(self)
    }

    pub fn unset_tag(mut self, key: impl Into<String>) -> Result<Self, TagError> {
        let key = key.into();
        validate_tag_key(&key)?;

        self.tags.insert(key, PatchValue::Unset);
        Ok(self)
    }

    /// Sets a private registry setting, e.g. `username`.
    pub fn set_registry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.registry.insert(key.into(), PatchValue::Set(value.into()));
        self
    }

    pub fn unset_registry(mut self, key: impl Into<String>) -> Self {
        self.registry.insert(key.into(), PatchValue::Unset);
        self
    }

    pub fn section(&self, section: Section) -> &PatchSection {
        match section {
            Section::Values => &self.values,
            Section::Memory => &self.memory,
            Section::Cpu => &self.cpu,
            Section::Tags => &self.tags,
            Section::Registry => &self.registry,
        }
    }

    /// Returns `true` if the patch does not mention a single key.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
            && self.memory.is_empty()
            && self.cpu.is_empty()
            && self.tags.is_empty()
            && self.registry.is_empty()
    }
}
