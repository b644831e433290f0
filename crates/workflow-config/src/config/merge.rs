use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use snafu::{Snafu, ensure};
use strum::IntoEnumIterator;

use crate::config::{ConfigPatch, Configuration, PatchValue, Section};

/// The error type returned when a [`ConfigPatch`] cannot be merged.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum MergeError {
    /// The patch does not mention any key, so there is nothing to release.
    #[snafu(display("the patch is empty, nothing to change"))]
    EmptyPatch,

    #[snafu(display("{section} key {key:?} cannot be unset, it does not exist"))]
    UnsetMissingKey { section: Section, key: String },

    #[snafu(display("No nodes matched the provided labels: {key}={value}"))]
    TagNotFound { key: String, value: String },
}

/// The labels carried by the nodes of a cluster.
///
/// A tag `key=value` is satisfiable if at least one node carries the label
/// `key` with exactly that value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterLabels(BTreeMap<String, BTreeSet<String>>);

impl ClusterLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a node carrying the given labels.
    pub fn add_node<K, V>(&mut self, labels: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in labels {
            self.0.entry(key.into()).or_default().insert(value.into());
        }
    }

    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.0.get(key).is_some_and(|values| values.contains(value))
    }
}

impl Configuration {
    /// Merges `patch` into this configuration and returns the result.
    ///
    /// The input is left untouched. Tags which are set by the patch must be
    /// satisfiable by `cluster`. Either all changes apply or none does.
    pub fn apply_patch(
        &self,
        patch: &ConfigPatch,
        cluster: &ClusterLabels,
    ) -> Result<Self, MergeError> {
        ensure!(!patch.is_empty(), EmptyPatchSnafu);

        for (key, value) in &patch.tags {
            if let PatchValue::Set(value) = value {
                ensure!(
                    cluster.contains(key, value),
                    TagNotFoundSnafu { key, value }
                );
            }
        }

        let mut merged = self.clone();
        for section in Section::iter() {
            let target = merged.section_mut(section);

            for (key, change) in patch.section(section) {
                match change {
                    PatchValue::Set(value) => {
                        target.insert(key.clone(), Value::String(value.clone()));
                    }
                    PatchValue::Unset => {
                        ensure!(
                            target.remove(key).is_some(),
                            UnsetMissingKeySnafu { section, key }
                        );
                    }
                }
            }
        }

        Ok(merged)
    }
}
