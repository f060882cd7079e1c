//! Error types with fix suggestions

use std::time::Duration;

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Everything a stream, driver or probe can report.
///
/// Writes never fail and reads on an empty handshake stream block, so the
/// streams themselves only ever produce [`MockIoError::DelimiterTimeout`].
/// The other variants come from the test tooling built on top of them.
#[derive(Error, Debug)]
pub enum MockIoError {
    #[error(
        "MOCKIO-010: delimiter {delimiter:?} not written within {timeout:?} ({} bytes read)",
        .partial.len()
    )]
    DelimiterTimeout {
        delimiter: char,
        timeout: Duration,
        /// Everything consumed from the stream before the deadline.
        partial: String,
    },

    #[error("MOCKIO-020: read did not complete within {waited:?}")]
    ReadStalled { waited: Duration },

    #[error("MOCKIO-030: expected {expected:?}, got {actual:?}")]
    Mismatch { expected: String, actual: String },

    #[error("MOCKIO-040: {what} disconnected")]
    Disconnected { what: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MockIoError {
    /// Data read before a delimiter timeout, if this is one.
    pub fn partial(&self) -> Option<&str> {
        match self {
            MockIoError::DelimiterTimeout { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Consumes the error, returning the partial read of a delimiter timeout.
    pub fn into_partial(self) -> Option<String> {
        match self {
            MockIoError::DelimiterTimeout { partial, .. } => Some(partial),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, MockIoError::DelimiterTimeout { .. })
    }
}

impl FixSuggestion for MockIoError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            MockIoError::DelimiterTimeout { .. } => {
                Some("Raise the timeout or check that the program writes the delimiter")
            }
            MockIoError::ReadStalled { .. } => {
                Some("A reader parked with data already buffered; rerun with RUST_LOG=mockio=trace")
            }
            MockIoError::Mismatch { .. } => {
                Some("Bytes were lost or reordered; rerun with fewer writers to isolate")
            }
            MockIoError::Disconnected { .. } => Some("The program thread panicked or returned early"),
            MockIoError::Io(_) => None,
        }
    }
}
