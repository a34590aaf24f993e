//! ChaCha20-Poly1305 AEAD for knock packet decryption
//!
//! The wire format carries an explicit 12-byte nonce per packet rather
//! than a counter, since a knock server never decrypts more than one
//! packet per key - reusing a counter-based scheme here would be solving
//! a problem this protocol doesn't have.

use chacha20poly1305::{ChaCha20Poly1305, KeyInit};
use chacha20poly1305::aead::{Aead, Payload};
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

/// Authentication tag size in bytes for ChaCha20-Poly1305
pub const TAG_SIZE: usize = 16;

/// Nonce size in bytes for ChaCha20-Poly1305
pub const NONCE_SIZE: usize = 12;

/// A single-use ChaCha20-Poly1305 cipher bound to one derived key
pub struct Cipher {
    inner: ChaCha20Poly1305,
}

impl Cipher {
    /// Construct a cipher from a 32-byte symmetric key
    #[inline]
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            inner: ChaCha20Poly1305::new(key.into()),
        }
    }

    /// Decrypt and verify `ciphertext || tag` with empty associated data
    ///
    /// Returned wrapped in [`Zeroizing`] so the decrypted plaintext is
    /// wiped from memory when the caller drops it.
    #[inline]
    pub fn open(&self, nonce: &[u8; NONCE_SIZE], ciphertext_and_tag: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let payload = Payload { msg: ciphertext_and_tag, aad: &[] };
        self.inner
            .decrypt(nonce.into(), payload)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Encrypt `plaintext` with empty associated data, appending the tag
    #[inline]
    pub fn seal(&self, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload { msg: plaintext, aad: &[] };
        self.inner
            .encrypt(nonce.into(), payload)
            .map_err(|_| CryptoError::EncryptionFailed("ChaCha20-Poly1305 encryption failed"))
    }
}
