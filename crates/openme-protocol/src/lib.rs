//! openme single packet authentication wire format
//!
//! Pure codec: parses and builds the 165-byte knock packet and its
//! 40-byte decrypted plaintext body. No cryptography, no I/O - those
//! live in `openme-crypto` and `openme-server`.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod constants;
pub mod error;
pub mod packet;
pub mod plaintext;

pub use constants::{
    DEFAULT_KNOCK_TIMEOUT_SECS, DEFAULT_REPLAY_WINDOW_SECS, DEFAULT_UDP_PORT,
    PACKET_SIZE, PLAINTEXT_SIZE, SIGNED_SIZE, VERSION,
};
pub use error::{ProtocolError, Result};
pub use packet::KnockPacket;
pub use plaintext::KnockPlaintext;
