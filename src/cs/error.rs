//! Error type shared by the decoding, channel and noise modules.

use thiserror::Error;

/// Errors raised while building codes, noise models or channel inputs.
///
/// Numerical saturation inside the decoder or the density table is never
/// reported here: those paths clamp to finite sentinels instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed code description.
    #[error("malformed code description at byte {position}: {reason}")]
    Format {
        /// Byte offset in the description where the problem was detected
        position: usize,
        /// What went wrong
        reason: String,
    },

    /// A parameter or vector length outside the accepted range.
    #[error("value out of range: {0}")]
    Range(String),

    /// Construction parameters that cannot produce a valid object.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Failure reading a code description.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn format(position: usize, reason: impl Into<String>) -> Self {
        Error::Format {
            position,
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
