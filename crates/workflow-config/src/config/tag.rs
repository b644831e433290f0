//! Validation of configuration tags.
//!
//! Tags pin the processes of an application to cluster nodes carrying a
//! matching label. The controller checks that a node with the label exists;
//! the format of tag keys and values follows the Kubernetes label rules and is
//! checked before a patch is ever sent.
//!
//! See <https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/>
//! for more information on Kubernetes labels.
use std::sync::LazyLock;

use regex::Regex;
use snafu::{Snafu, ensure};

const TAG_PREFIX_MAX_LEN: usize = 253;
const TAG_NAME_MAX_LEN: usize = 63;
const TAG_VALUE_MAX_LEN: usize = 63;

// Lazily initialized regular expressions
static TAG_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("failed to compile tag prefix regex")
});

static TAG_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9A-Z]([a-z0-9A-Z-_.]*[a-z0-9A-Z]+)?$")
        .expect("failed to compile tag name regex")
});

/// The error type for tag parse/validation operations.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum TagError {
    /// Indicates that the optional DNS prefix of the tag key is invalid.
    #[snafu(display("tag key prefix {prefix:?} is not a valid DNS subdomain"))]
    PrefixInvalid { prefix: String },

    #[snafu(display(
        "tag key prefix exceeds the maximum length - expected 253 characters or less, got {length}"
    ))]
    PrefixTooLong { length: usize },

    /// Indicates that the name part of the tag key is empty.
    #[snafu(display("tag key name must not be empty"))]
    NameEmpty,

    #[snafu(display(
        "tag key name exceeds the maximum length - expected 63 characters or less, got {length}"
    ))]
    NameTooLong { length: usize },

    #[snafu(display("tag key name {name:?} violates kubernetes format"))]
    NameInvalid { name: String },

    /// Indicates that the tag value exceeds the maximum length of 63 ASCII
    /// characters.
    #[snafu(display(
        "tag value exceeds the maximum length - expected 63 characters or less, got {length}"
    ))]
    ValueTooLong { length: usize },

    /// Indicates that the tag value contains non-ASCII characters.
    #[snafu(display("tag value contains non-ascii characters"))]
    ValueNotAscii,

    #[snafu(display("tag value {value:?} violates kubernetes format"))]
    ValueInvalid { value: String },
}

/// Validates a tag key, which consists of an optional DNS subdomain prefix
/// and a name, separated by a slash (`example.com/disk`).
pub fn validate_tag_key(key: &str) -> Result<(), TagError> {
    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            ensure!(
                prefix.len() <= TAG_PREFIX_MAX_LEN,
                PrefixTooLongSnafu {
                    length: prefix.len()
                }
            );
            ensure!(TAG_PREFIX_REGEX.is_match(prefix), PrefixInvalidSnafu { prefix });
            name
        }
        None => key,
    };

    ensure!(!name.is_empty(), NameEmptySnafu);
    ensure!(
        name.len() <= TAG_NAME_MAX_LEN,
        NameTooLongSnafu { length: name.len() }
    );
    ensure!(TAG_NAME_REGEX.is_match(name), NameInvalidSnafu { name });

    Ok(())
}

/// Validates a tag value. Unlike plain Kubernetes label values, tag values
/// must not be empty, because an empty value never selects a node.
pub fn validate_tag_value(value: &str) -> Result<(), TagError> {
    ensure!(
        value.len() <= TAG_VALUE_MAX_LEN,
        ValueTooLongSnafu {
            length: value.len()
        }
    );
    ensure!(value.is_ascii(), ValueNotAsciiSnafu);
    ensure!(TAG_NAME_REGEX.is_match(value), ValueInvalidSnafu { value });

    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("disk")]
    #[case("node-role")]
    #[case("example.com/disk")]
    #[case("topology.kubernetes.io/zone")]
    fn valid_key(#[case] key: &str) {
        validate_tag_key(key).unwrap();
    }

    #[rstest]
    #[case("", TagError::NameEmpty)]
    #[case("example.com/", TagError::NameEmpty)]
    #[case("-disk", TagError::NameInvalid { name: "-disk".to_owned() })]
    #[case("Example.com/disk", TagError::PrefixInvalid { prefix: "Example.com".to_owned() })]
    #[case("a".repeat(64), TagError::NameTooLong { length: 64 })]
    fn invalid_key(#[case] key: String, #[case] error: TagError) {
        assert_eq!(validate_tag_key(&key).unwrap_err(), error);
    }

    #[rstest]
    #[case("a".repeat(64), TagError::ValueTooLong { length: 64 })]
    #[case("ssd-", TagError::ValueInvalid { value: "ssd-".to_owned() })]
    #[case("", TagError::ValueInvalid { value: String::new() })]
    #[case("ä", TagError::ValueNotAscii)]
    fn invalid_value(#[case] value: String, #[case] error: TagError) {
        assert_eq!(validate_tag_value(&value).unwrap_err(), error);
    }

    #[test]
    fn valid_value() {
        validate_tag_value("ssd").unwrap();
        validate_tag_value("eu-west-1a").unwrap();
    }
}
