//! openme server configuration: YAML document parsing and validation
//!
//! Loads the on-disk `ServerInit` document, decodes its base64 key
//! material, resolves each client's effective port list against
//! `allowed_ports_mode`, and rejects duplicate names or keys before the
//! rest of the system ever sees a [`ClientRecord`](openme_core::ClientRecord).

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod document;
pub mod init;

pub use document::{
    AllowedPortsMode, ClientDocument, LogFormat, PortDocument, ProtocolDocument, ServerDocument,
};
pub use init::ServerInit;

use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the configuration file
    #[error("failed to read configuration file: {0}")]
    Io(#[source] std::io::Error),

    /// YAML parse error
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Base64 decoding failed for the named field/client
    #[error("invalid base64 in {0}")]
    InvalidBase64(String),

    /// Decoded key material was not the expected length
    #[error("invalid key length for {context}: expected {expected} bytes, got {got}")]
    InvalidKeyLength {
        /// Field or client name the key belongs to
        context: String,
        /// Expected byte length
        expected: usize,
        /// Actual decoded byte length
        got: usize,
    },

    /// A client's Ed25519 public key bytes did not form a valid point
    #[error("invalid Ed25519 public key for client {0}")]
    InvalidPublicKey(String),

    /// Two clients share the same name
    #[error("duplicate client name: {0}")]
    DuplicateClientName(String),

    /// The document listed no clients
    #[error("configuration must list at least one client")]
    EmptyClientList,

    /// Validation failed while building the client registry (duplicate keys, etc.)
    #[error("registry error: {0}")]
    Registry(#[from] openme_core::CoreError),
}

/// Result type for config operations
pub type Result<T> = std::result::Result<T, ConfigError>;
