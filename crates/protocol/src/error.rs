//! Error types for the protocol crate.

use thiserror::Error;

use crate::command::MAX_COMMAND_LEN;

/// Protocol error type covering all connection-fatal failure modes.
///
/// Command-local failures (missing file, existing destination, failed
/// directory change) are not errors at this level: they travel to the peer
/// inside `NO` replies or messages and the session continues.
#[derive(Debug, Error)]
pub enum ProtocolError {
    // Command framing errors
    /// A command line filled the whole buffer without a terminator.
    #[error("command too long: no terminator within {max} bytes")]
    CommandTooLong {
        /// Maximum encoded command length.
        max: usize,
    },

    /// The peer closed the connection in the middle of a command line.
    #[error("unterminated command: peer closed after {received} bytes")]
    UnterminatedCommand {
        /// Bytes received before the close.
        received: usize,
    },

    /// A command line contains a NUL byte before its end.
    #[error("command contains an interior NUL byte at offset {offset}")]
    InteriorNul {
        /// Offset of the first NUL byte.
        offset: usize,
    },

    /// The command line did not match any known verb.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    // Header errors
    /// A transfer reply started with something other than `OK` or `NO`.
    #[error("invalid reply tag: expected \"OK\" or \"NO\", got {0:?}")]
    InvalidTag([u8; 2]),

    // Connection errors
    /// Connection was closed unexpectedly.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Underlying socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(std::io::Error),

    // Proxy errors
    /// An allow-listed program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Reason reported by the OS.
        source: std::io::Error,
    },

    /// File transfer failed after the header exchange.
    #[error("transfer failed: {0}")]
    TransferFailed(String),
}

impl ProtocolError {
    /// Shorthand for the over-length command error.
    pub fn command_too_long() -> Self {
        ProtocolError::CommandTooLong {
            max: MAX_COMMAND_LEN,
        }
    }

    /// Whether the error means the peer went away.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            ProtocolError::ConnectionClosed(_) | ProtocolError::UnterminatedCommand { .. }
        )
    }
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed(err.to_string()),
            _ => ProtocolError::Io(err),
        }
    }
}
