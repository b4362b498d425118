//! Crate-wide error type
//!
//! Nothing here is retried internally. Every request either reaches the
//! socket or fails, and the caller decides what to do next.

use crate::protocol::X11Error;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The display socket could not be dialed.
    #[error("failed to connect to {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The server answered the setup request with `Failed`.
    #[error("X server rejected connection: {0}")]
    ConnectionRejected(String),

    /// The server asked for credentials we could not supply.
    #[error("X server requires authentication: {0}")]
    AuthenticationRequired(String),

    /// A read or write on an established connection failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    /// A setup reply or event record was shorter than its fixed fields.
    #[error("malformed {what}: need {needed} bytes, got {available}")]
    MalformedResponse {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// The server closed the stream (or the connection was shut down).
    #[error("connection closed")]
    Closed,

    /// The server answered a reply-bearing request with an error record.
    #[error("{0}")]
    Protocol(X11Error),

    /// A request, or the smallest piece it can be split into, exceeds the
    /// length the protocol or the server accepts.
    #[error("{what} of {bytes} bytes exceeds the {max_bytes}-byte limit")]
    RequestTooLarge {
        what: &'static str,
        bytes: usize,
        max_bytes: usize,
    },

    /// Property data length is not a whole number of `format`-bit elements,
    /// or `format` is not 8, 16 or 32.
    #[error("{len} bytes of property data do not match format {format}")]
    InvalidPropertyFormat { format: u8, len: usize },

    /// Image strips would be placed past the 16-bit coordinate range.
    #[error("image strip at y={0} is outside the 16-bit coordinate range")]
    CoordinateOverflow(i64),

    /// A pixel buffer length does not match its declared dimensions.
    #[error("pixel buffer has {actual} bytes, expected {expected}")]
    InvalidBuffer { expected: usize, actual: usize },

    /// A synchronous read was attempted while the event pump owns the stream.
    #[error("the event pump owns the read half of this connection")]
    EventPumpRunning,

    #[error("invalid display name: {0:?}")]
    InvalidDisplay(String),
}

impl Error {
    pub(crate) fn malformed(what: &'static str, needed: usize, available: usize) -> Self {
        Error::MalformedResponse {
            what,
            needed,
            available,
        }
    }

    pub(crate) fn too_large(what: &'static str, bytes: usize, max_bytes: usize) -> Self {
        Error::RequestTooLarge {
            what,
            bytes,
            max_bytes,
        }
    }

    /// Map an EOF on read to `Closed`, everything else to `Io`.
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::Closed
        } else {
            Error::Io(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
