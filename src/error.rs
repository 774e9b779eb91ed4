//! Structured error taxonomy for the network core.
//!
//! Three zones: per-message protocol errors are represented directly as
//! [`crate::protocol::StatusCode`] values and never reach here; the types
//! below cover per-session transport failures and core/process failures.

use crate::session::SessionId;
use thiserror::Error;

/// Errors that can occur while reading or writing a single session's
/// connection, or while decoding a message from its byte stream.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// An OS-level primitive failed unexpectedly.
    #[error("errno error in {function}: {message} (code {code})")]
    Errno {
        /// The syscall or library function that failed.
        function: &'static str,
        /// The OS error code, if one was available.
        code: i32,
        /// A human-readable description.
        message: String,
    },

    /// A read or write on a session's socket completed with fewer bytes
    /// than required and could not be retried.
    #[error("short read/write on session {session:?}: {message}")]
    SocketFailure {
        /// The session whose socket failed.
        session: SessionId,
        /// A human-readable description.
        message: String,
    },

    /// The remote end closed the connection cleanly while a message was
    /// being read (a zero-byte read on the first byte of a new message).
    #[error("session {session:?} disconnected")]
    SocketDisconnected {
        /// The session that disconnected.
        session: SessionId,
    },

    /// The first byte of a message did not correspond to any known
    /// message type.
    #[error("session {session:?} sent an unknown message type tag {tag}")]
    InvalidMessageType {
        /// The session that sent the bad tag.
        session: SessionId,
        /// The offending tag byte.
        tag: u8,
    },
}

impl ConnectionError {
    /// Whether this error should result in the owning session being
    /// disconnected.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(
            self,
            ConnectionError::SocketDisconnected { .. }
                | ConnectionError::InvalidMessageType { .. }
                | ConnectionError::SocketFailure { .. }
        )
    }
}

/// Errors that bubble all the way up to the process owner and trigger a
/// full shutdown.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Failed to bind or listen on the configured TCP endpoint.
    #[error("failed to start listener on {addr}: {source}")]
    ListenerFailed {
        /// The address that was attempted.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configured documents directory could not be created or is
    /// otherwise inaccessible.
    #[error("documents directory {path} is inaccessible: {source}")]
    DocumentsDirInaccessible {
        /// The configured directory path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The credential store could not be opened.
    #[error("credential store at {path} could not be opened: {source}")]
    CredentialStoreUnavailable {
        /// The configured database path.
        path: String,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
    },

    /// A lifecycle guard was violated: something that should be a
    /// singleton was constructed twice.
    #[error("{0} was already instantiated")]
    AlreadyInstantiated(&'static str),

    /// A lifecycle guard was violated: something was used before it was
    /// constructed.
    #[error("{0} was not yet instantiated")]
    NotYetInstantiated(&'static str),
}
