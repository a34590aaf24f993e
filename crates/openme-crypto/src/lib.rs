//! openme Cryptographic Primitives
//!
//! This crate provides the cryptographic foundation for openme, using only
//! audited, pure-Rust implementations. No OpenSSL dependency.
//!
//! # Security Principles
//! - All key material implements `Zeroize` for secure memory clearing
//! - Constant-time comparisons for all authentication operations
//! - No custom cryptography - only well-audited implementations
//! - Perfect Forward Secrecy through ephemeral key exchange

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod keys;
pub mod cipher;
pub mod kdf;

pub use error::{CryptoError, Result};
pub use keys::{
    StaticSecret, PublicKey, SharedSecret,
    SigningKey, VerifyingKey, Signature,
    EphemeralKeyPair,
};
pub use cipher::{Cipher, NONCE_SIZE, TAG_SIZE};
pub use kdf::{derive_symmetric_key, HKDF_INFO};
