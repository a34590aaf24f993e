//! Knock packet wire format
//!
//! # Layout (165 bytes)
//! ```text
//! offset  size  field
//! 0       1     version
//! 1       32    ephemeral_pubkey
//! 33      12    aead_nonce
//! 45      40    ciphertext
//! 85      16    aead_tag
//! 101     64    signature
//! ```
//! Bytes `[0..101)` are the signed prefix: the message the sender's
//! Ed25519 signature covers.

use crate::constants::{PACKET_SIZE, SIGNED_SIZE, VERSION};
use crate::{ProtocolError, Result};

const EPHEMERAL_PUBKEY_OFFSET: usize = 1;
const AEAD_NONCE_OFFSET: usize = 33;
const CIPHERTEXT_OFFSET: usize = 45;
const AEAD_TAG_OFFSET: usize = 85;
const SIGNATURE_OFFSET: usize = 101;

const EPHEMERAL_PUBKEY_LEN: usize = 32;
const AEAD_NONCE_LEN: usize = 12;
const CIPHERTEXT_LEN: usize = 40;
const AEAD_TAG_LEN: usize = 16;
const SIGNATURE_LEN: usize = 64;

/// A parsed knock packet
///
/// Borrows nothing - all fields are owned copies, since the caller's
/// buffer is typically a scratch receive buffer reused for the next
/// datagram.
#[derive(Debug, Clone)]
pub struct KnockPacket {
    /// Wire format version, always `VERSION` for a successfully parsed packet
    pub version: u8,
    /// Sender's ephemeral X25519 public key
    pub ephemeral_pubkey: [u8; 32],
    /// AEAD nonce used to seal the ciphertext
    pub aead_nonce: [u8; 12],
    /// Ciphertext of the 40-byte plaintext body
    pub ciphertext: [u8; 40],
    /// Poly1305 authentication tag
    pub aead_tag: [u8; 16],
    /// Ed25519 signature over the signed prefix
    pub signature: [u8; 64],
}

impl KnockPacket {
    /// Parse a datagram into a `KnockPacket`
    ///
    /// Rejects anything that isn't exactly `PACKET_SIZE` bytes before
    /// looking at the version byte, so an oversized or truncated datagram
    /// never gets partial field access.
    #[inline]
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() != PACKET_SIZE {
            return Err(ProtocolError::WrongSize {
                expected: PACKET_SIZE,
                got: buf.len(),
            });
        }

        let version = buf[0];
        if version != VERSION {
            return Err(ProtocolError::WrongVersion(version));
        }

        let mut ephemeral_pubkey = [0u8; EPHEMERAL_PUBKEY_LEN];
        ephemeral_pubkey.copy_from_slice(&buf[EPHEMERAL_PUBKEY_OFFSET..EPHEMERAL_PUBKEY_OFFSET + EPHEMERAL_PUBKEY_LEN]);

        let mut aead_nonce = [0u8; AEAD_NONCE_LEN];
        aead_nonce.copy_from_slice(&buf[AEAD_NONCE_OFFSET..AEAD_NONCE_OFFSET + AEAD_NONCE_LEN]);

        let mut ciphertext = [0u8; CIPHERTEXT_LEN];
        ciphertext.copy_from_slice(&buf[CIPHERTEXT_OFFSET..CIPHERTEXT_OFFSET + CIPHERTEXT_LEN]);

        let mut aead_tag = [0u8; AEAD_TAG_LEN];
        aead_tag.copy_from_slice(&buf[AEAD_TAG_OFFSET..AEAD_TAG_OFFSET + AEAD_TAG_LEN]);

        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&buf[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_LEN]);

        Ok(Self {
            version,
            ephemeral_pubkey,
            aead_nonce,
            ciphertext,
            aead_tag,
            signature,
        })
    }

    /// View of bytes `[0..SIGNED_SIZE)`, the message the signature covers
    pub fn signed_prefix(&self) -> [u8; SIGNED_SIZE] {
        let mut out = [0u8; SIGNED_SIZE];
        out[0] = self.version;
        out[EPHEMERAL_PUBKEY_OFFSET..EPHEMERAL_PUBKEY_OFFSET + EPHEMERAL_PUBKEY_LEN]
            .copy_from_slice(&self.ephemeral_pubkey);
        out[AEAD_NONCE_OFFSET..AEAD_NONCE_OFFSET + AEAD_NONCE_LEN].copy_from_slice(&self.aead_nonce);
        out[CIPHERTEXT_OFFSET..CIPHERTEXT_OFFSET + CIPHERTEXT_LEN].copy_from_slice(&self.ciphertext);
        out[AEAD_TAG_OFFSET..AEAD_TAG_OFFSET + AEAD_TAG_LEN].copy_from_slice(&self.aead_tag);
        out
    }

    /// Ciphertext and tag concatenated, as the AEAD primitive expects
    pub fn ciphertext_and_tag(&self) -> [u8; CIPHERTEXT_LEN + AEAD_TAG_LEN] {
        let mut out = [0u8; CIPHERTEXT_LEN + AEAD_TAG_LEN];
        out[..CIPHERTEXT_LEN].copy_from_slice(&self.ciphertext);
        out[CIPHERTEXT_LEN..].copy_from_slice(&self.aead_tag);
        out
    }

    /// Serialize a fresh packet to the 165-byte wire format
    ///
    /// Used by tests and by clients constructing a knock to send.
    pub fn build(
        ephemeral_pubkey: [u8; 32],
        aead_nonce: [u8; 12],
        ciphertext: [u8; 40],
        aead_tag: [u8; 16],
        signature: [u8; 64],
    ) -> [u8; PACKET_SIZE] {
        let packet = Self {
            version: VERSION,
            ephemeral_pubkey,
            aead_nonce,
            ciphertext,
            aead_tag,
            signature,
        };
        packet.to_bytes()
    }

    /// Serialize this packet to the 165-byte wire format
    pub fn to_bytes(&self) -> [u8; PACKET_SIZE] {
        let mut out = [0u8; PACKET_SIZE];
        let prefix = self.signed_prefix();
        out[..SIGNED_SIZE].copy_from_slice(&prefix);
        out[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_LEN].copy_from_slice(&self.signature);
        out
    }
}
