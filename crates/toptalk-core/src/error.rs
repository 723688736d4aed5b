//! Error taxonomy shared by every pipeline stage.
//!
//! Only [`Error::ConfigMissing`] is fatal, and only at startup. Everything
//! else is handled inside the polling loop by skipping or retrying. A lookup
//! that finds nothing is not an error and has no variant here.

use std::time::Duration;

use crate::types::WindowId;

/// Why the current cycle has no window to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReady {
    /// The clock is not on a 5-minute rotation boundary.
    NotBoundary { minute: u32 },
    /// This window was already processed by an earlier cycle.
    AlreadyProcessed(WindowId),
}

impl std::fmt::Display for NotReady {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotReady::NotBoundary { minute } => {
                write!(f, "minute {minute} is not a rotation boundary")
            }
            NotReady::AlreadyProcessed(id) => write!(f, "window {id} already processed"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required configuration key is absent or does not parse.
    #[error("configuration: {0}")]
    ConfigMissing(String),

    #[error("window not ready: {0}")]
    WindowNotReady(NotReady),

    /// The external extraction command could not be started.
    #[error("could not start `{command}`: {source}")]
    ExtractionUnavailable {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command started but emitted nothing within the first-line timeout.
    #[error("`{command}` produced no output within {waited:?}")]
    ExtractionStalled { command: String, waited: Duration },

    #[error("malformed record ({reason}): {line:?}")]
    MalformedRecord { line: String, reason: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigMissing(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
