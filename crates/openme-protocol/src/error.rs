//! Protocol error types

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Datagram was not exactly `PACKET_SIZE` bytes
    #[error("malformed packet: expected {expected} bytes, got {got}")]
    WrongSize {
        /// Expected size
        expected: usize,
        /// Actual size received
        got: usize,
    },

    /// The version byte was not `VERSION`
    #[error("unsupported packet version: {0}")]
    WrongVersion(u8),

    /// A decoded plaintext buffer was not `PLAINTEXT_SIZE` bytes
    #[error("malformed plaintext: expected {expected} bytes, got {got}")]
    WrongPlaintextSize {
        /// Expected size
        expected: usize,
        /// Actual size received
        got: usize,
    },
}
