use bytes::Bytes;
use http::StatusCode;
use serde::Deserialize;
use snafu::Snafu;
use strum::Display;

use crate::{app::AppId, transport::TransportError};

/// Error messages of the controller containing this text (compared
/// case-insensitively) reject a tag which no cluster node carries.
pub const TAG_NOT_FOUND_MARKER: &str = "no nodes matched the provided labels";

/// The error type of the configuration API.
///
/// Every failure is classified and returned, the client never retries.
/// Use [`Error::kind`] to branch on the class of failure.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("app {app} was not found: {message}"))]
    NotFound { app: AppId, message: String },

    /// The controller refused to create a release, e.g. because the patch
    /// was empty.
    #[snafu(display("patch for app {app} conflicts: {message}"))]
    Conflict { app: AppId, message: String },

    #[snafu(display("patch for app {app} was rejected: {message}"))]
    Unprocessable { app: AppId, message: String },

    #[snafu(display("patch for app {app} references a tag no node carries: {message}"))]
    TagNotFound { app: AppId, message: String },

    #[snafu(display("controller answered {status} for app {app}: {body}"))]
    Api {
        app: AppId,
        status: StatusCode,
        body: String,
    },

    #[snafu(display("failed to talk to the controller"))]
    Transport { source: TransportError },

    #[snafu(display("failed to encode patch for app {app}"))]
    Encode {
        source: serde_json::Error,
        app: AppId,
    },

    #[snafu(display("failed to decode configuration of app {app}"))]
    Decode {
        source: serde_json::Error,
        app: AppId,
    },
}

/// The class of an [`Error`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Unprocessable,
    TagNotFound,
    Api,
    Transport,
    Encode,
    Decode,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Unprocessable { .. } => ErrorKind::Unprocessable,
            Self::TagNotFound { .. } => ErrorKind::TagNotFound,
            Self::Api { .. } => ErrorKind::Api,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Encode { .. } => ErrorKind::Encode,
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// Classifies a non-successful response of the controller.
    pub(crate) fn from_response(app: &AppId, status: StatusCode, body: &Bytes) -> Self {
        let message = error_message(body);
        let app = app.clone();

        match status {
            StatusCode::NOT_FOUND => Self::NotFound { app, message },
            StatusCode::CONFLICT => Self::Conflict { app, message },
            StatusCode::UNPROCESSABLE_ENTITY
                if message.to_lowercase().contains(TAG_NOT_FOUND_MARKER) =>
            {
                Self::TagNotFound { app, message }
            }
            StatusCode::UNPROCESSABLE_ENTITY => Self::Unprocessable { app, message },
            status => Self::Api {
                app,
                status,
                body: String::from_utf8_lossy(body).into_owned(),
            },
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Extracts the human readable message of an error response. The controller
/// sends `{"detail": "..."}`, field validation errors are passed on verbatim.
fn error_message(body: &Bytes) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody { detail }) => detail,
        Err(_) => String::from_utf8_lossy(body).trim().to_owned(),
    }
}
