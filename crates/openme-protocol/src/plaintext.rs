//! Decrypted knock plaintext (40 bytes)
//!
//! ```text
//! offset  size  field
//! 0       8     timestamp_ns (signed, big-endian, Unix nanoseconds)
//! 8       16    random_nonce
//! 24      16    target_ip (IPv6 bytes; all-zero = unspecified)
//! ```

use std::net::Ipv6Addr;

use crate::constants::PLAINTEXT_SIZE;
use crate::{ProtocolError, Result};

const TIMESTAMP_LEN: usize = 8;
const RANDOM_NONCE_OFFSET: usize = 8;
const RANDOM_NONCE_LEN: usize = 16;
const TARGET_IP_OFFSET: usize = 24;
const TARGET_IP_LEN: usize = 16;

/// Decoded knock plaintext
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnockPlaintext {
    /// Sender's clock at the time the knock was built, Unix nanoseconds
    pub timestamp_ns: i64,
    /// Per-knock random value, also used as the replay cache key
    pub random_nonce: [u8; 16],
    /// Requested target, or `None` when the client left it unspecified
    ///
    /// `None` means "open for the datagram's source address"; `Some`
    /// is an explicit (possibly delegated) target.
    pub target_ip: Option<Ipv6Addr>,
}

impl KnockPlaintext {
    /// Parse a decrypted 40-byte plaintext body
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() != PLAINTEXT_SIZE {
            return Err(ProtocolError::WrongPlaintextSize {
                expected: PLAINTEXT_SIZE,
                got: buf.len(),
            });
        }

        let mut timestamp_bytes = [0u8; TIMESTAMP_LEN];
        timestamp_bytes.copy_from_slice(&buf[..TIMESTAMP_LEN]);
        let timestamp_ns = i64::from_be_bytes(timestamp_bytes);

        let mut random_nonce = [0u8; RANDOM_NONCE_LEN];
        random_nonce.copy_from_slice(&buf[RANDOM_NONCE_OFFSET..RANDOM_NONCE_OFFSET + RANDOM_NONCE_LEN]);

        let mut target_ip_bytes = [0u8; TARGET_IP_LEN];
        target_ip_bytes.copy_from_slice(&buf[TARGET_IP_OFFSET..TARGET_IP_OFFSET + TARGET_IP_LEN]);
        let target_ip = if target_ip_bytes == [0u8; TARGET_IP_LEN] {
            None
        } else {
            Some(Ipv6Addr::from(target_ip_bytes))
        };

        Ok(Self {
            timestamp_ns,
            random_nonce,
            target_ip,
        })
    }

    /// Serialize to the 40-byte wire plaintext
    pub fn to_bytes(&self) -> [u8; PLAINTEXT_SIZE] {
        let mut out = [0u8; PLAINTEXT_SIZE];
        out[..TIMESTAMP_LEN].copy_from_slice(&self.timestamp_ns.to_be_bytes());
        out[RANDOM_NONCE_OFFSET..RANDOM_NONCE_OFFSET + RANDOM_NONCE_LEN].copy_from_slice(&self.random_nonce);

        let target_bytes = match self.target_ip {
            Some(ip) => ip.octets(),
            None => [0u8; TARGET_IP_LEN],
        };
        out[TARGET_IP_OFFSET..TARGET_IP_OFFSET + TARGET_IP_LEN].copy_from_slice(&target_bytes);

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_wildcard_target() {
        let plaintext = KnockPlaintext {
            timestamp_ns: 1_700_000_000_000_000_000,
            random_nonce: [0x77; 16],
            target_ip: None,
        };

        let bytes = plaintext.to_bytes();
        let parsed = KnockPlaintext::parse(&bytes).unwrap();
        assert_eq!(parsed, plaintext);
        assert_eq!(&bytes[TARGET_IP_OFFSET..], &[0u8; 16]);
    }

    #[test]
    fn test_roundtrip_explicit_target() {
        let plaintext = KnockPlaintext {
            timestamp_ns: -1,
            random_nonce: [0x01; 16],
            target_ip: Some(Ipv6Addr::from([0, 0, 0, 0, 0, 0xffff, 0x0a00, 0x0005])),
        };

        let bytes = plaintext.to_bytes();
        let parsed = KnockPlaintext::parse(&bytes).unwrap();
        assert_eq!(parsed, plaintext);
    }

    #[test]
    fn test_wrong_size_rejected() {
        let bytes = [0u8; PLAINTEXT_SIZE - 1];
        assert!(matches!(
            KnockPlaintext::parse(&bytes),
            Err(ProtocolError::WrongPlaintextSize { .. })
        ));
    }
}
