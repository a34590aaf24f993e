//! Per-datagram knock validation pipeline
//!
//! Every step here can only end in two ways: move to the next step, or
//! silently drop. No step ever writes to the socket or returns a
//! distinguishable error to the network - that would defeat the point of
//! single packet authentication.

use std::net::IpAddr;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use openme_core::{ClientRegistry, PortSpec, ReplayCache, ReplayOutcome};
use openme_crypto::{kdf, Cipher, PublicKey, Signature, StaticSecret};
use openme_firewall::FirewallManager;
use openme_protocol::{KnockPacket, KnockPlaintext};

/// Shared state every datagram is validated against
pub struct PipelineState {
    /// Server's long-lived X25519 static secret
    pub server_secret: StaticSecret,
    /// Replay protection cache
    pub replay_cache: Arc<ReplayCache>,
    /// Current client registry snapshot
    pub registry: Arc<ClientRegistry>,
    /// Firewall rule lifecycle manager
    pub manager: Arc<FirewallManager>,
    /// Whether a client's explicit `target_ip` is honored
    pub allow_delegated_target: bool,
}

/// Why a datagram was dropped, for log-level selection only
///
/// Never serialized, never sent back to a peer - the network sees the
/// same nothing regardless of which variant fired.
#[derive(Debug)]
enum DropReason {
    WireMalformed,
    CryptoEcdh,
    CryptoAead,
    PlaintextParse,
    Replay,
    UnknownClient,
    ExpiredClient,
}

/// Process one received datagram
///
/// `source_ip` is the UDP peer address the datagram arrived from.
pub async fn handle_datagram(state: Arc<PipelineState>, buf: Vec<u8>, source_ip: IpAddr) {
    if let Err(reason) = process(&state, &buf, source_ip).await {
        log_drop(reason, source_ip);
    }
}

async fn process(state: &PipelineState, buf: &[u8], source_ip: IpAddr) -> Result<(), DropReason> {
    let packet = KnockPacket::parse(buf).map_err(|_| DropReason::WireMalformed)?;

    let ephemeral_pubkey = PublicKey::from_bytes(packet.ephemeral_pubkey);
    let shared_secret = state.server_secret.diffie_hellman(&ephemeral_pubkey);

    let symmetric_key = kdf::derive_symmetric_key(shared_secret.as_bytes(), kdf::HKDF_INFO)
        .map_err(|_| DropReason::CryptoEcdh)?;

    let cipher = Cipher::new(&symmetric_key);
    let plaintext_bytes = cipher
        .open(&packet.aead_nonce, &packet.ciphertext_and_tag())
        .map_err(|_| DropReason::CryptoAead)?;

    let plaintext = KnockPlaintext::parse(&plaintext_bytes).map_err(|_| DropReason::PlaintextParse)?;

    if state
        .replay_cache
        .check_and_record(plaintext.timestamp_ns, plaintext.random_nonce)
        == ReplayOutcome::Replay
    {
        return Err(DropReason::Replay);
    }

    let signed_prefix = packet.signed_prefix();
    let signature = Signature::from_bytes(&packet.signature);
    let client = state
        .registry
        .find_by_signature(&signed_prefix, &signature)
        .ok_or(DropReason::UnknownClient)?;

    if client.is_expired() {
        return Err(DropReason::ExpiredClient);
    }

    let effective_target_ip = if state.allow_delegated_target {
        // A delegated target travels over the wire as plain IPv6 bytes
        // (SPEC_FULL §3); canonicalize an IPv4-mapped address back to V4
        // so the firewall backend picks the matching tool/address family.
        plaintext
            .target_ip
            .map(|v6| v6.to_canonical())
            .unwrap_or(source_ip)
    } else {
        source_ip
    };

    let ports: Vec<PortSpec> = client.ports.clone();
    if let Err(e) = state.manager.open(effective_target_ip, ports).await {
        error!(%effective_target_ip, error = %e, "firewall backend refused to open rule");
        return Ok(());
    }

    info!(
        client = %client.name,
        source = %source_ip,
        target = %effective_target_ip,
        key_fingerprint = %fingerprint(client),
        "valid knock received"
    );

    Ok(())
}

fn fingerprint(client: &openme_core::ClientRecord) -> String {
    let digest = Sha256::digest(client.pubkey.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

fn log_drop(reason: DropReason, source_ip: IpAddr) {
    match reason {
        DropReason::WireMalformed | DropReason::CryptoEcdh | DropReason::CryptoAead | DropReason::PlaintextParse => {
            debug!(%source_ip, ?reason, "dropped malformed datagram");
        }
        DropReason::Replay => {
            warn!(%source_ip, "replay detected");
        }
        DropReason::UnknownClient => {
            warn!(%source_ip, "unknown or invalid client signature");
        }
        DropReason::ExpiredClient => {
            warn!(%source_ip, "client key expired");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::time::Duration;

    use openme_core::{ClientRecord, Protocol};
    use openme_crypto::{EphemeralKeyPair, SigningKey};
    use openme_firewall::testing::MockBackend;

    struct Knocker {
        signing_key: SigningKey,
        server_public: PublicKey,
    }

    impl Knocker {
        fn build_packet(&self, timestamp_ns: i64, nonce: [u8; 16], target_ip: Option<Ipv6Addr>) -> Vec<u8> {
            let ephemeral = EphemeralKeyPair::generate();
            let ephemeral_pubkey = *ephemeral.public_key().as_bytes();
            let shared = ephemeral.diffie_hellman(&self.server_public);
            let key = kdf::derive_symmetric_key(shared.as_bytes(), kdf::HKDF_INFO).unwrap();
            let cipher = Cipher::new(&key);

            let plaintext = KnockPlaintext { timestamp_ns, random_nonce: nonce, target_ip };
            let nonce_bytes = [0x09u8; 12];
            let sealed = cipher.seal(&nonce_bytes, &plaintext.to_bytes()).unwrap();

            let mut ciphertext = [0u8; 40];
            ciphertext.copy_from_slice(&sealed[..40]);
            let mut tag = [0u8; 16];
            tag.copy_from_slice(&sealed[40..]);

            let unsigned = KnockPacket {
                version: openme_protocol::VERSION,
                ephemeral_pubkey,
                aead_nonce: nonce_bytes,
                ciphertext,
                aead_tag: tag,
                signature: [0u8; 64],
            };
            let signature = self.signing_key.sign(&unsigned.signed_prefix()).to_bytes();

            KnockPacket::build(ephemeral_pubkey, nonce_bytes, ciphertext, tag, signature).to_vec()
        }
    }

    fn now_ns() -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos() as i64
    }

    async fn build_state(
        signing_key: &SigningKey,
        expires: Option<chrono::DateTime<chrono::Utc>>,
        allow_delegated_target: bool,
    ) -> (Arc<PipelineState>, StaticSecret, Arc<MockBackend>) {
        let server_secret = StaticSecret::generate();
        let registry = ClientRegistry::build(vec![ClientRecord {
            name: "alice".to_string(),
            pubkey: signing_key.verifying_key(),
            ports: vec![PortSpec::new(22, Protocol::Tcp)],
            expires,
        }])
        .unwrap();

        let backend = Arc::new(MockBackend::new());
        let manager = Arc::new(FirewallManager::new(backend.clone(), Duration::from_secs(30)));

        let state = Arc::new(PipelineState {
            server_secret: StaticSecret::from_bytes(server_secret.to_bytes()),
            replay_cache: Arc::new(ReplayCache::new(Duration::from_secs(60))),
            registry: Arc::new(registry),
            manager,
            allow_delegated_target,
        });

        (state, server_secret, backend)
    }

    #[tokio::test]
    async fn test_valid_knock_opens_firewall() {
        let signing_key = SigningKey::generate();
        let (state, server_secret, backend) = build_state(&signing_key, None, true).await;
        let knocker = Knocker { signing_key, server_public: server_secret.public_key() };

        let source: IpAddr = "203.0.113.9".parse().unwrap();
        let packet = knocker.build_packet(now_ns(), [0xAA; 16], None);

        handle_datagram(state, packet, source).await;

        assert_eq!(
            backend.open_calls(),
            vec![(source, vec![PortSpec::new(22, Protocol::Tcp)])]
        );
    }

    #[tokio::test]
    async fn test_replayed_nonce_rejected() {
        let signing_key = SigningKey::generate();
        let (state, server_secret, backend) = build_state(&signing_key, None, true).await;
        let knocker = Knocker { signing_key, server_public: server_secret.public_key() };

        let source: IpAddr = "203.0.113.9".parse().unwrap();
        let packet = knocker.build_packet(now_ns(), [0xBB; 16], None);

        handle_datagram(state.clone(), packet.clone(), source).await;
        handle_datagram(state, packet, source).await;

        assert_eq!(backend.open_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_signature_rejected() {
        let signing_key = SigningKey::generate();
        let stranger_key = SigningKey::generate();
        let (state, server_secret, backend) = build_state(&signing_key, None, true).await;
        let knocker = Knocker { signing_key: stranger_key, server_public: server_secret.public_key() };

        let source: IpAddr = "203.0.113.9".parse().unwrap();
        let packet = knocker.build_packet(now_ns(), [0xCC; 16], None);

        handle_datagram(state, packet, source).await;

        assert!(backend.open_calls().is_empty());
    }

    #[tokio::test]
    async fn test_expired_client_rejected() {
        let signing_key = SigningKey::generate();
        let expired = chrono::Utc::now() - chrono::Duration::seconds(1);
        let (state, server_secret, backend) = build_state(&signing_key, Some(expired), true).await;
        let knocker = Knocker { signing_key, server_public: server_secret.public_key() };

        let source: IpAddr = "203.0.113.9".parse().unwrap();
        let packet = knocker.build_packet(now_ns(), [0xDD; 16], None);

        handle_datagram(state, packet, source).await;

        assert!(backend.open_calls().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_datagram_dropped() {
        let signing_key = SigningKey::generate();
        let (state, server_secret, backend) = build_state(&signing_key, None, true).await;
        let knocker = Knocker { signing_key, server_public: server_secret.public_key() };

        let source: IpAddr = "203.0.113.9".parse().unwrap();
        let mut packet = knocker.build_packet(now_ns(), [0xEE; 16], None);
        packet.extend_from_slice(&[0u8; 35]);

        handle_datagram(state, packet, source).await;

        assert!(backend.open_calls().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_target_delegation() {
        let signing_key = SigningKey::generate();
        let (state, server_secret, backend) = build_state(&signing_key, None, true).await;
        let knocker = Knocker { signing_key, server_public: server_secret.public_key() };

        let source: IpAddr = "203.0.113.9".parse().unwrap();
        let target = Ipv6Addr::from([0, 0, 0, 0, 0, 0xffff, 0x0a00, 0x0005]); // ::ffff:10.0.0.5
        let packet = knocker.build_packet(now_ns(), [0xFF; 16], Some(target));

        handle_datagram(state, packet, source).await;

        let calls = backend.open_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)));
    }

    #[tokio::test]
    async fn test_delegation_disabled_uses_source() {
        let signing_key = SigningKey::generate();
        let (state, server_secret, backend) = build_state(&signing_key, None, false).await;
        let knocker = Knocker { signing_key, server_public: server_secret.public_key() };

        let source: IpAddr = "203.0.113.9".parse().unwrap();
        let target = Ipv6Addr::from([0, 0, 0, 0, 0, 0xffff, 0x0a00, 0x0005]);
        let packet = knocker.build_packet(now_ns(), [0x12; 16], Some(target));

        handle_datagram(state, packet, source).await;

        let calls = backend.open_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, source);
    }
}
