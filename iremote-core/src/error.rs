//! Domain-specific error types for the iRemote protocol.
//!
//! All fallible operations return `Result<T, IRemoteError>`.
//! Nothing here panics on wire input; every failure is typed and
//! reported upward so the session can decide the connection's fate.

use std::io;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IRemoteError>;

/// The canonical error type for the iRemote client.
#[derive(Debug, Error)]
pub enum IRemoteError {
    // ── Handshake Errors ─────────────────────────────────────────
    /// The TCP connection to the controller could not be opened.
    #[error("cannot connect to the iRemote server at {addr}: {source}")]
    ConnectionFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The controller never sent its handshake status byte.
    #[error("iRemote server handshake timed out")]
    StatusTimeout,

    /// The controller refused us because its connection slots are full.
    #[error("too many connections to the iRemote server")]
    TooManyConnections,

    /// The controller refused us outright.
    #[error("access to the iRemote server was denied")]
    AccessDenied,

    /// Unknown handshake status or a failure while reading it.
    #[error("internal handshake error: {0}")]
    InternalError(String),

    // ── Channel Errors ───────────────────────────────────────────
    /// Any I/O failure on an established connection.
    #[error("communication error: {0}")]
    Communication(#[from] io::Error),

    /// A command was issued while no connection is open.
    #[error("not connected")]
    NotConnected,

    // ── Argument Errors ──────────────────────────────────────────
    /// An argument is outside the bounds the protocol accepts.
    #[error("value out of range: {0}")]
    ValueOutOfRange(String),

    // ── Poll Errors ──────────────────────────────────────────────
    /// A poll message refers to an entity the mirror does not hold.
    #[error("{kind} index {index} outside mirrored collection of {len}")]
    ProtocolInconsistency {
        kind: &'static str,
        index: i64,
        len: usize,
    },

    /// A poll message field could not be parsed.
    #[error("malformed {tag} message: {reason}")]
    MalformedMessage { tag: String, reason: String },

    // ── Lifecycle Errors ─────────────────────────────────────────
    /// A session phase transition was attempted from the wrong phase.
    #[error("invalid session transition: {0}")]
    InvalidState(&'static str),

    /// The session (or its mirror) has been disposed.
    #[error("session disposed")]
    Disposed,
}

impl IRemoteError {
    /// Shorthand for building a [`IRemoteError::ValueOutOfRange`].
    pub fn out_of_range(what: impl Into<String>) -> Self {
        IRemoteError::ValueOutOfRange(what.into())
    }

    /// Wrap a decoding problem in an established-connection error.
    pub(crate) fn invalid_data(what: impl Into<String>) -> Self {
        IRemoteError::Communication(io::Error::new(io::ErrorKind::InvalidData, what.into()))
    }

    /// `true` for the rejections that end a connect attempt during the
    /// handshake phase.
    pub fn is_handshake_rejection(&self) -> bool {
        matches!(
            self,
            IRemoteError::StatusTimeout
                | IRemoteError::TooManyConnections
                | IRemoteError::AccessDenied
                | IRemoteError::InternalError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = IRemoteError::ProtocolInconsistency {
            kind: "socket",
            index: 7,
            len: 3,
        };
        assert!(e.to_string().contains("socket"));
        assert!(e.to_string().contains('7'));
        assert!(e.to_string().contains('3'));

        let e = IRemoteError::out_of_range("hour 24");
        assert!(e.to_string().contains("hour 24"));
    }

    #[test]
    fn from_io() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe broke");
        let e: IRemoteError = io_err.into();
        assert!(matches!(e, IRemoteError::Communication(_)));
    }

    #[test]
    fn handshake_rejections() {
        assert!(IRemoteError::AccessDenied.is_handshake_rejection());
        assert!(IRemoteError::TooManyConnections.is_handshake_rejection());
        assert!(!IRemoteError::NotConnected.is_handshake_rejection());
        assert!(!IRemoteError::invalid_data("short").is_handshake_rejection());
    }
}
