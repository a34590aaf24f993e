//! Protocol constants
//!
//! These sizes and values are fixed by the wire format and must never
//! change without bumping `VERSION`.

/// Current wire format version
pub const VERSION: u8 = 0x01;

/// Total size of a knock packet on the wire
pub const PACKET_SIZE: usize = 165;

/// Size of the signed prefix (everything before the Ed25519 signature)
pub const SIGNED_SIZE: usize = 101;

/// Size of the decrypted plaintext body
pub const PLAINTEXT_SIZE: usize = 40;

/// Default UDP port the knock server listens on
pub const DEFAULT_UDP_PORT: u16 = 54154;

/// Default one-shot timer duration for an opened firewall rule
pub const DEFAULT_KNOCK_TIMEOUT_SECS: u64 = 30;

/// Default replay cache window
pub const DEFAULT_REPLAY_WINDOW_SECS: u64 = 60;
