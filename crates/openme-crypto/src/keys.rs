//! Cryptographic key types with secure memory handling
//!
//! All secret key material implements `Zeroize` to ensure keys are
//! securely cleared from memory when dropped.

use ed25519_dalek::{
    SigningKey as Ed25519SigningKey,
    VerifyingKey as Ed25519VerifyingKey,
    Signature as Ed25519Signature,
    Signer, Verifier,
};
use x25519_dalek::{
    StaticSecret as X25519StaticSecret,
    PublicKey as X25519PublicKey,
    SharedSecret as X25519SharedSecret,
};
use zeroize::ZeroizeOnDrop;

use crate::{CryptoError, Result};

/// X25519 static secret key for key exchange
///
/// The server holds exactly one of these, generated once and loaded from
/// configuration at startup.
#[derive(ZeroizeOnDrop)]
pub struct StaticSecret {
    inner: X25519StaticSecret,
}

impl StaticSecret {
    /// Generate a new random static secret
    pub fn generate() -> Self {
        Self {
            inner: X25519StaticSecret::random_from_rng(rand::rngs::OsRng),
        }
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            inner: X25519StaticSecret::from(bytes),
        }
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: X25519PublicKey::from(&self.inner),
        }
    }

    /// Perform Diffie-Hellman key exchange with a peer's ephemeral public key
    ///
    /// Never fails: x25519-dalek accepts any 32-byte peer point, including
    /// low-order points. A malicious or malformed ephemeral key simply
    /// produces a shared secret that will not derive the key the sender
    /// actually used, so the AEAD step fails downstream instead.
    pub fn diffie_hellman(&self, their_public: &PublicKey) -> SharedSecret {
        SharedSecret {
            inner: self.inner.diffie_hellman(&their_public.inner),
        }
    }

    /// Export as bytes (use with caution - prefer keeping in memory)
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }
}

/// X25519 public key for key exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    inner: X25519PublicKey,
}

impl PublicKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            inner: X25519PublicKey::from(bytes),
        }
    }

    /// Export as bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.inner.as_bytes()
    }

    /// Export as bytes (owned)
    pub fn to_bytes(&self) -> [u8; 32] {
        *self.inner.as_bytes()
    }
}

/// Shared secret from a Diffie-Hellman exchange
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret {
    inner: X25519SharedSecret,
}

impl SharedSecret {
    /// Raw shared secret bytes
    ///
    /// Callers should derive keys from this via HKDF, never use it
    /// directly as a symmetric key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.inner.as_bytes()
    }
}

/// Ed25519 signing key
///
/// Belongs to a client. The server never holds one of these - it only
/// verifies against the `VerifyingKey`s in its registry.
#[derive(ZeroizeOnDrop)]
pub struct SigningKey {
    inner: Ed25519SigningKey,
}

impl SigningKey {
    /// Generate a new random signing key
    pub fn generate() -> Self {
        Self {
            inner: Ed25519SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            inner: Ed25519SigningKey::from_bytes(bytes),
        }
    }

    /// Get the corresponding verifying key
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey {
            inner: self.inner.verifying_key(),
        }
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            inner: self.inner.sign(message),
        }
    }

    /// Export as bytes (use with caution)
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }
}

/// Ed25519 verifying (public) key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyingKey {
    inner: Ed25519VerifyingKey,
}

impl VerifyingKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let inner = Ed25519VerifyingKey::from_bytes(bytes)
            .map_err(|_| CryptoError::InvalidKeyLength { expected: 32, got: bytes.len() })?;
        Ok(Self { inner })
    }

    /// Verify a signature
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        self.inner
            .verify(message, &signature.inner)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    /// Export as bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.inner.as_bytes()
    }

    /// Export as bytes (owned)
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }
}

/// Ed25519 signature
#[derive(Clone, Debug)]
pub struct Signature {
    inner: Ed25519Signature,
}

impl Signature {
    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Self {
            inner: Ed25519Signature::from_bytes(bytes),
        }
    }

    /// Export as bytes
    pub fn to_bytes(&self) -> [u8; 64] {
        self.inner.to_bytes()
    }
}

/// Ephemeral X25519 key pair for forward secrecy
///
/// The client generates one of these per knock and discards it after the
/// datagram is sent.
pub struct EphemeralKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral key pair
    pub fn generate() -> Self {
        let secret = StaticSecret::generate();
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Get the public key to send to the peer
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Perform key exchange and consume this ephemeral key
    pub fn diffie_hellman(self, their_public: &PublicKey) -> SharedSecret {
        self.secret.diffie_hellman(their_public)
    }
}
