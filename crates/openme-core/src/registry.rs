//! Client registry and signature-based identity lookup
//!
//! The wire format carries no client identifier - a knock proves identity
//! purely through whose Ed25519 key verifies its signature. The registry
//! therefore resolves identity by linear scan rather than map lookup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use openme_crypto::{Signature, VerifyingKey};

use crate::ports::PortSpec;
use crate::{CoreError, Result};

/// A registered client
#[derive(Clone)]
pub struct ClientRecord {
    /// Human-readable client name, used only for logging
    pub name: String,
    /// Client's Ed25519 public key
    pub pubkey: VerifyingKey,
    /// Ports the firewall opens for this client on a valid knock
    pub ports: Vec<PortSpec>,
    /// Optional expiry; an expired client is treated as unknown
    pub expires: Option<DateTime<Utc>>,
}

impl ClientRecord {
    /// Whether this client's key has expired as of now
    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|at| Utc::now() > at)
    }

    /// First 8 bytes of SHA-256 over the raw public key, as lowercase hex
    ///
    /// Used in logs to identify a client without printing the full key.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.pubkey.as_bytes());
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// An immutable snapshot of the client roster
///
/// Built once from configuration and never mutated; a reload builds a
/// new snapshot and swaps it in via [`ClientRegistryHandle`].
pub struct ClientRegistry {
    clients: Vec<ClientRecord>,
}

impl ClientRegistry {
    /// Build a registry from a set of client records
    ///
    /// Rejects duplicate names or duplicate public keys, since either
    /// would make signature-based lookup ambiguous.
    pub fn build(clients: Vec<ClientRecord>) -> Result<Self> {
        if clients.is_empty() {
            return Err(CoreError::EmptyRegistry);
        }

        for (i, a) in clients.iter().enumerate() {
            for b in &clients[i + 1..] {
                if a.name == b.name {
                    return Err(CoreError::DuplicateClientName(a.name.clone()));
                }
                if a.pubkey == b.pubkey {
                    return Err(CoreError::DuplicateClientKey(a.name.clone()));
                }
            }
        }

        Ok(Self { clients })
    }

    /// Find the client whose key verifies `signature` over `signed_prefix`
    ///
    /// Returns the matching record even if its `expires` has passed -
    /// expiry is a separate enforcement step so callers can log "unknown
    /// client" and "client key expired" as the distinct events they are.
    /// On the wire the two are still indistinguishable: both end in a
    /// silent drop.
    pub fn find_by_signature(&self, signed_prefix: &[u8], signature: &Signature) -> Option<&ClientRecord> {
        self.clients
            .iter()
            .find(|client| client.pubkey.verify(signed_prefix, signature).is_ok())
    }

    /// Number of registered clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether the registry has no clients
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Holds the current registry snapshot behind a lock, for atomic reload
pub struct ClientRegistryHandle {
    current: parking_lot::RwLock<Arc<ClientRegistry>>,
}

impl ClientRegistryHandle {
    /// Create a handle wrapping an initial registry
    pub fn new(registry: ClientRegistry) -> Self {
        Self {
            current: parking_lot::RwLock::new(Arc::new(registry)),
        }
    }

    /// Get the current registry snapshot
    ///
    /// In-flight handlers that already cloned an `Arc` keep using their
    /// snapshot even after a concurrent `swap`.
    pub fn current(&self) -> Arc<ClientRegistry> {
        self.current.read().clone()
    }

    /// Atomically replace the current registry
    pub fn swap(&self, registry: ClientRegistry) {
        *self.current.write() = Arc::new(registry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openme_crypto::SigningKey;
    use crate::ports::Protocol;

    fn client(name: &str, signing_key: &SigningKey, expires: Option<DateTime<Utc>>) -> ClientRecord {
        ClientRecord {
            name: name.to_string(),
            pubkey: signing_key.verifying_key(),
            ports: vec![PortSpec::new(22, Protocol::Tcp)],
            expires,
        }
    }

    #[test]
    fn test_find_by_signature() {
        let alice_key = SigningKey::generate();
        let bob_key = SigningKey::generate();

        let registry = ClientRegistry::build(vec![
            client("alice", &alice_key, None),
            client("bob", &bob_key, None),
        ])
        .unwrap();

        let message = b"signed prefix bytes";
        let sig = alice_key.sign(message);

        let found = registry.find_by_signature(message, &sig).unwrap();
        assert_eq!(found.name, "alice");
    }

    #[test]
    fn test_unknown_signature_not_found() {
        let alice_key = SigningKey::generate();
        let stranger_key = SigningKey::generate();

        let registry = ClientRegistry::build(vec![client("alice", &alice_key, None)]).unwrap();

        let message = b"signed prefix bytes";
        let sig = stranger_key.sign(message);

        assert!(registry.find_by_signature(message, &sig).is_none());
    }

    #[test]
    fn test_expired_client_still_matches_but_reports_expired() {
        let alice_key = SigningKey::generate();
        let expired = Utc::now() - chrono::Duration::seconds(1);

        let registry = ClientRegistry::build(vec![client("alice", &alice_key, Some(expired))]).unwrap();

        let message = b"signed prefix bytes";
        let sig = alice_key.sign(message);

        let found = registry.find_by_signature(message, &sig).unwrap();
        assert!(found.is_expired());
    }

    #[test]
    fn test_duplicate_pubkey_rejected() {
        let shared_key = SigningKey::generate();

        let result = ClientRegistry::build(vec![
            client("alice", &shared_key, None),
            client("alice-2", &shared_key, None),
        ]);

        assert!(matches!(result, Err(CoreError::DuplicateClientKey(_))));
    }

    #[test]
    fn test_reload_swap_is_atomic() {
        let alice_key = SigningKey::generate();
        let registry = ClientRegistry::build(vec![client("alice", &alice_key, None)]).unwrap();
        let handle = ClientRegistryHandle::new(registry);

        let snapshot = handle.current();
        assert_eq!(snapshot.len(), 1);

        let bob_key = SigningKey::generate();
        let new_registry = ClientRegistry::build(vec![client("bob", &bob_key, None)]).unwrap();
        handle.swap(new_registry);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(handle.current().len(), 1);
        assert_eq!(handle.current().find_by_signature(b"x", &alice_key.sign(b"x")).map(|c| c.name.clone()), None);
    }
}
