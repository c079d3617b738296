//! Error types for request building, sending and response reading.
//!
//! # Design
//! Configuration mistakes are reported synchronously as `InvalidArgument`
//! before any I/O happens. A non-2xx status only becomes an error when the
//! caller asks for it (`ensure_success` or one of the `fetch_*` helpers), and
//! it carries nothing but the status code because the body is never parsed
//! on that path. Transport failures are boxed and passed through untouched.

use thiserror::Error;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned while building, sending or reading a request.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration call received a blank or otherwise unusable value.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// The response status was outside the 2xx range.
    #[error("HTTP status {status} is not a success status")]
    Http { status: u16 },

    /// The request body could not be produced.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be parsed into the requested type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The cancellation token fired while an operation was in flight.
    #[error("operation was cancelled")]
    Cancelled,

    /// The transport failed (DNS, connect, timeout, ...).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
}

impl Error {
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Transport(err.into())
    }

    /// The status code carried by an `Http` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status } => Some(*status),
            _ => None,
        }
    }

    /// True for failures in either direction of (de)serialization.
    pub fn is_serialization(&self) -> bool {
        matches!(self, Error::Serialization(_) | Error::Deserialization(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
