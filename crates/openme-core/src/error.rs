//! Core error types

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors
#[derive(Debug, Error)]
pub enum CoreError {
    /// A client record in the registry has no unique public key
    #[error("duplicate client public key: {0}")]
    DuplicateClientKey(String),

    /// A client record in the registry has no unique name
    #[error("duplicate client name: {0}")]
    DuplicateClientName(String),

    /// A registry was built with no clients
    #[error("client registry is empty")]
    EmptyRegistry,

    /// Cryptographic error
    #[error("crypto error: {0}")]
    CryptoError(#[from] openme_crypto::CryptoError),

    /// Protocol error
    #[error("protocol error: {0}")]
    ProtocolError(#[from] openme_protocol::ProtocolError),
}
