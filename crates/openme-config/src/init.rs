//! Validated server initialization, built from a [`ServerDocument`]
//!
//! This is the boundary between untrusted on-disk YAML and the types the
//! rest of the system operates on: base64 is decoded, port lists are
//! resolved, and duplicate names/keys are rejected here so nothing
//! downstream has to re-check them.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use openme_core::{ClientRecord, ClientRegistry, PortSpec, Protocol};
use openme_crypto::StaticSecret;
use openme_firewall::FirewallKind;
use tracing::info;

use crate::document::{AllowedPortsMode, ClientDocument, ServerDocument};
use crate::{ConfigError, Result};

/// Validated, ready-to-use server configuration
///
/// Produced once at startup (and again on a reload signal) from a
/// [`ServerDocument`]. Secret key material lives here only long enough to
/// be handed to the crypto layer; decoding never logs the decoded bytes.
pub struct ServerInit {
    /// UDP port the knock server listens on
    pub udp_port: u16,
    /// TCP health port
    pub health_port: u16,
    /// Server's X25519 static secret
    pub server_secret: StaticSecret,
    /// Replay cache window
    pub replay_window: Duration,
    /// Firewall rule expiry
    pub knock_timeout: Duration,
    /// Which firewall backend to instantiate
    pub firewall_backend: FirewallKind,
    /// Validated client registry with resolved port lists
    pub registry: ClientRegistry,
    /// Default `tracing` level when `RUST_LOG` is unset
    pub log_level: String,
    /// Pretty or JSON log rendering
    pub log_format: crate::document::LogFormat,
    /// Whether a client's explicit `target_ip` is honored
    pub allow_delegated_target: bool,
}

impl ServerInit {
    /// Load and validate a [`ServerInit`] from a YAML file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_yaml(&raw)
    }

    /// Parse and validate a [`ServerInit`] from a YAML string
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let document: ServerDocument = serde_yaml::from_str(raw)?;
        Self::from_document(document)
    }

    /// Validate a parsed [`ServerDocument`] into a [`ServerInit`]
    pub fn from_document(document: ServerDocument) -> Result<Self> {
        if document.clients.is_empty() {
            return Err(ConfigError::EmptyClientList);
        }

        let server_secret = decode_x25519_secret(&document.server_x25519_secret_b64)?;

        let default_ports: Vec<PortSpec> = document
            .default_ports
            .iter()
            .map(|p| PortSpec::new(p.port, p.proto.into()))
            .collect();

        let mut seen_names = HashSet::with_capacity(document.clients.len());
        let mut records = Vec::with_capacity(document.clients.len());
        for client in &document.clients {
            if !seen_names.insert(client.name.clone()) {
                return Err(ConfigError::DuplicateClientName(client.name.clone()));
            }
            records.push(build_client_record(
                client,
                document.allowed_ports_mode,
                &default_ports,
                document.health_port,
            )?);
        }

        let registry = ClientRegistry::build(records)?;
        info!(clients = registry.len(), "configuration loaded");

        Ok(Self {
            udp_port: document.udp_port,
            health_port: document.health_port,
            server_secret,
            replay_window: Duration::from_secs(document.replay_window_secs),
            knock_timeout: Duration::from_secs(document.knock_timeout_secs),
            firewall_backend: document.firewall_backend,
            registry,
            log_level: document.log_level,
            log_format: document.log_format,
            allow_delegated_target: document.allow_delegated_target,
        })
    }
}

fn build_client_record(
    client: &ClientDocument,
    mode: AllowedPortsMode,
    default_ports: &[PortSpec],
    health_port: u16,
) -> Result<ClientRecord> {
    let pubkey_bytes = decode_fixed_32(&client.ed25519_pubkey_b64, &client.name)?;
    let pubkey = openme_crypto::VerifyingKey::from_bytes(&pubkey_bytes)
        .map_err(|_| ConfigError::InvalidPublicKey(client.name.clone()))?;

    let client_ports: Vec<PortSpec> = client
        .ports
        .iter()
        .map(|p| PortSpec::new(p.port, p.proto.into()))
        .collect();

    let mut ports = match mode {
        AllowedPortsMode::Default => default_ports.to_vec(),
        AllowedPortsMode::Only => client_ports,
        AllowedPortsMode::DefaultPlus => {
            let mut combined = default_ports.to_vec();
            for port in client_ports {
                if !combined.contains(&port) {
                    combined.push(port);
                }
            }
            combined
        }
    };

    if client.include_health_port {
        let health = PortSpec::new(health_port, Protocol::Tcp);
        if let Some(pos) = ports.iter().position(|p| *p == health) {
            ports.remove(pos);
        }
        ports.insert(0, health);
    }

    Ok(ClientRecord {
        name: client.name.clone(),
        pubkey,
        ports,
        expires: client.expires,
    })
}

fn decode_fixed_32(b64: &str, context: &str) -> Result<[u8; 32]> {
    let bytes = BASE64
        .decode(b64)
        .map_err(|_| ConfigError::InvalidBase64(context.to_string()))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| ConfigError::InvalidKeyLength {
            context: context.to_string(),
            expected: 32,
            got: v.len(),
        })
}

fn decode_x25519_secret(b64: &str) -> Result<StaticSecret> {
    let bytes = decode_fixed_32(b64, "server_x25519_secret_b64")?;
    Ok(StaticSecret::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn b64(bytes: [u8; 32]) -> String {
        BASE64.encode(bytes)
    }

    fn server_secret_b64() -> String {
        b64(openme_crypto::StaticSecret::generate().to_bytes())
    }

    fn client_pubkey_b64() -> String {
        let key = openme_crypto::SigningKey::generate();
        b64(key.verifying_key().to_bytes())
    }

    fn minimal_yaml(pubkey: &str) -> String {
        format!(
            r#"
udp_port: 54154
health_port: 22022
server_x25519_secret_b64: "{secret}"
replay_window_secs: 60
knock_timeout_secs: 30
firewall_backend: nftables
allowed_ports_mode: default_plus
default_ports:
  - {{ port: 22, proto: tcp }}
clients:
  - name: alice
    ed25519_pubkey_b64: "{pubkey}"
    ports: []
    include_health_port: true
    expires: null
"#,
            secret = server_secret_b64(),
            pubkey = pubkey,
        )
    }

    #[test]
    fn test_load_minimal_document() {
        let init = ServerInit::from_yaml(&minimal_yaml(&client_pubkey_b64())).unwrap();
        assert_eq!(init.udp_port, 54154);
        assert_eq!(init.health_port, 22022);
        assert_eq!(init.registry.len(), 1);
    }

    #[test]
    fn test_default_plus_prepends_health_port_once() {
        let alice_key = openme_crypto::SigningKey::generate();
        let pubkey = b64(alice_key.verifying_key().to_bytes());
        let init = ServerInit::from_yaml(&minimal_yaml(&pubkey)).unwrap();

        let message = b"signed prefix";
        let signature = alice_key.sign(message);
        let alice = init
            .registry
            .find_by_signature(message, &signature)
            .expect("alice should verify against her own signature");

        // default_ports=[22/tcp], client ports=[], health_port=22022/tcp prepended once.
        assert_eq!(
            alice.ports,
            vec![
                PortSpec::new(22022, Protocol::Tcp),
                PortSpec::new(22, Protocol::Tcp),
            ]
        );
    }

    #[test]
    fn test_duplicate_client_name_rejected() {
        let pubkey = client_pubkey_b64();
        let yaml = format!(
            r#"
udp_port: 54154
health_port: 22022
server_x25519_secret_b64: "{secret}"
firewall_backend: iptables
clients:
  - name: alice
    ed25519_pubkey_b64: "{pubkey}"
  - name: alice
    ed25519_pubkey_b64: "{pubkey2}"
"#,
            secret = server_secret_b64(),
            pubkey = pubkey,
            pubkey2 = client_pubkey_b64(),
        );

        let result = ServerInit::from_yaml(&yaml);
        assert!(matches!(result, Err(ConfigError::DuplicateClientName(_))));
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let yaml = format!(
            r#"
udp_port: 54154
health_port: 22022
server_x25519_secret_b64: "not-valid-base64!!"
firewall_backend: iptables
clients:
  - name: alice
    ed25519_pubkey_b64: "{pubkey}"
"#,
            pubkey = client_pubkey_b64(),
        );

        let result = ServerInit::from_yaml(&yaml);
        assert!(matches!(result, Err(ConfigError::InvalidBase64(_))));
    }

    #[test]
    fn test_empty_client_list_rejected() {
        let yaml = format!(
            r#"
udp_port: 54154
health_port: 22022
server_x25519_secret_b64: "{secret}"
firewall_backend: iptables
clients: []
"#,
            secret = server_secret_b64(),
        );

        let result = ServerInit::from_yaml(&yaml);
        assert!(matches!(result, Err(ConfigError::EmptyClientList)));
    }

    #[test]
    fn test_only_mode_ignores_default_ports() {
        let yaml = format!(
            r#"
udp_port: 54154
health_port: 22022
server_x25519_secret_b64: "{secret}"
firewall_backend: iptables
allowed_ports_mode: only
default_ports:
  - {{ port: 22, proto: tcp }}
clients:
  - name: alice
    ed25519_pubkey_b64: "{pubkey}"
    ports:
      - {{ port: 8080, proto: tcp }}
    include_health_port: false
"#,
            secret = server_secret_b64(),
            pubkey = client_pubkey_b64(),
        );

        let init = ServerInit::from_yaml(&yaml).unwrap();
        assert_eq!(init.registry.len(), 1);
    }
}
