use std::{
    fmt::{Debug, Display},
    ops::Deref,
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use snafu::{Snafu, ensure};

const APP_ID_MAX_LEN: usize = 63;

static APP_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("failed to compile app id regex")
});

/// The error type for application identifier parse/validation operations.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum AppIdError {
    /// Indicates that the application identifier is empty.
    #[snafu(display("app id must not be empty"))]
    Empty,

    /// Indicates that the application identifier exceeds the maximum length
    /// of 63 characters.
    #[snafu(display(
        "app id exceeds the maximum length - expected 63 characters or less, got {length}"
    ))]
    TooLong { length: usize },

    /// Indicates that the identifier is not a lowercase RFC 1123 label.
    #[snafu(display(
        "app id {input:?} must be a lowercase RFC 1123 label, e.g. \"billing-worker\""
    ))]
    Invalid { input: String },
}

/// A validated application identifier, as used in the `/v2/apps/{app}` path.
///
/// Instances are always valid lowercase RFC 1123 labels, the format the
/// controller uses for application names: non-empty, at most 63 characters,
/// lowercase alphanumerics or `-`, starting and ending with an alphanumeric.
/// This makes it safe to use the identifier as a URL path segment.
///
/// ```
/// # use workflow_config::AppId;
/// let app: AppId = "billing-worker".parse().unwrap();
/// assert_eq!(app.to_string(), "billing-worker");
///
/// assert!("Billing_Worker".parse::<AppId>().is_err());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppId(String);

impl Debug for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl FromStr for AppId {
    type Err = AppIdError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ensure!(!input.is_empty(), EmptySnafu);
        ensure!(
            input.len() <= APP_ID_MAX_LEN,
            TooLongSnafu {
                length: input.len()
            }
        );
        ensure!(APP_ID_REGEX.is_match(input), InvalidSnafu { input });

        Ok(Self(input.to_owned()))
    }
}

impl TryFrom<&str> for AppId {
    type Error = AppIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Deref for AppId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for AppId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AppId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let input = String::deserialize(deserializer)?;
        input.parse().map_err(D::Error::custom)
    }
}
