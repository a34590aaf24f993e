//! Key Derivation Functions
//!
//! Uses HKDF-SHA256 to derive a single symmetric key from an ECDH shared
//! secret. An empty salt is intentional: the info string carries all the
//! domain separation this protocol needs, and the shared secret already
//! has 256 bits of entropy from the X25519 exchange.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

/// Fixed HKDF info string binding derived keys to this protocol and cipher.
///
/// Changing this value changes every derived key; it exists so that this
/// key schedule can never collide with a key schedule for some other use
/// of the same shared secret.
pub const HKDF_INFO: &[u8] = b"openme-v1-chacha20poly1305";

/// Derive a 32-byte symmetric key from a Diffie-Hellman shared secret
///
/// `HKDF-SHA-256(ikm = shared_secret, salt = empty, info, length = 32)`
///
/// Returned wrapped in [`Zeroizing`] so the derived key is wiped from
/// memory when the caller drops it, rather than left on the stack.
#[inline]
pub fn derive_symmetric_key(shared_secret: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut okm = Zeroizing::new([0u8; 32]);
    hkdf.expand(info, &mut *okm)
        .map_err(|_| CryptoError::KeyDerivationFailed("HKDF expansion failed"))?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_symmetric_key_deterministic() {
        let shared_secret = [0x42u8; 32];

        let key1 = derive_symmetric_key(&shared_secret, HKDF_INFO).unwrap();
        let key2 = derive_symmetric_key(&shared_secret, HKDF_INFO).unwrap();

        assert_eq!(*key1, *key2);
    }

    #[test]
    fn test_derive_symmetric_key_info_changes_output() {
        let shared_secret = [0x42u8; 32];

        let key1 = derive_symmetric_key(&shared_secret, HKDF_INFO).unwrap();
        let key2 = derive_symmetric_key(&shared_secret, b"something-else").unwrap();

        assert_ne!(*key1, *key2);
    }

    #[test]
    fn test_derive_symmetric_key_secret_changes_output() {
        let key1 = derive_symmetric_key(&[0x01u8; 32], HKDF_INFO).unwrap();
        let key2 = derive_symmetric_key(&[0x02u8; 32], HKDF_INFO).unwrap();

        assert_ne!(*key1, *key2);
    }
}
