//! On-disk shape of the server configuration document
//!
//! These types mirror the YAML document byte-for-byte; they carry no
//! validation and no decoded key material. [`crate::init::ServerInit::load`]
//! turns a [`ServerDocument`] into validated, ready-to-use types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use openme_core::Protocol;
use openme_firewall::FirewallKind;
use openme_protocol::constants::{
    DEFAULT_KNOCK_TIMEOUT_SECS, DEFAULT_REPLAY_WINDOW_SECS, DEFAULT_UDP_PORT,
};

/// How a client's effective port list is resolved against the server's
/// `default_ports`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowedPortsMode {
    /// Every client gets exactly the server's `default_ports`
    Default,
    /// Every client gets exactly its own `ports` list
    Only,
    /// Every client gets the union, server defaults first
    DefaultPlus,
}

/// A `{ port, proto }` pair as written in YAML
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PortDocument {
    /// Port number
    pub port: u16,
    /// Transport protocol
    pub proto: ProtocolDocument,
}

/// `tcp` or `udp`, as written in YAML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolDocument {
    /// TCP
    Tcp,
    /// UDP
    Udp,
}

impl From<ProtocolDocument> for Protocol {
    fn from(value: ProtocolDocument) -> Self {
        match value {
            ProtocolDocument::Tcp => Protocol::Tcp,
            ProtocolDocument::Udp => Protocol::Udp,
        }
    }
}

fn default_udp_port() -> u16 {
    DEFAULT_UDP_PORT
}

fn default_replay_window_secs() -> u64 {
    DEFAULT_REPLAY_WINDOW_SECS
}

fn default_knock_timeout_secs() -> u64 {
    DEFAULT_KNOCK_TIMEOUT_SECS
}

fn default_allowed_ports_mode() -> AllowedPortsMode {
    AllowedPortsMode::DefaultPlus
}

fn default_include_health_port() -> bool {
    true
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_allow_delegated_target() -> bool {
    true
}

/// Log line rendering, chosen in config and overridable by `RUST_LOG`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,
    /// One JSON object per line
    Json,
}

/// Root of the on-disk YAML configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDocument {
    /// UDP port the knock server listens on
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,

    /// TCP health port, prepended to client port lists unless opted out
    pub health_port: u16,

    /// Base64-encoded 32-byte X25519 static secret
    pub server_x25519_secret_b64: String,

    /// Replay window, in seconds
    #[serde(default = "default_replay_window_secs")]
    pub replay_window_secs: u64,

    /// Firewall rule expiry, in seconds
    #[serde(default = "default_knock_timeout_secs")]
    pub knock_timeout_secs: u64,

    /// Which firewall backend to instantiate
    pub firewall_backend: FirewallKind,

    /// Default level passed to `tracing-subscriber`'s `EnvFilter` when
    /// `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Pretty or JSON log rendering
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Whether a client's explicit `target_ip` is honored
    ///
    /// When `false`, the effective target is always the datagram source
    /// regardless of what the plaintext's `target_ip` field requests.
    #[serde(default = "default_allow_delegated_target")]
    pub allow_delegated_target: bool,

    /// How client port lists are resolved against `default_ports`
    #[serde(default = "default_allowed_ports_mode")]
    pub allowed_ports_mode: AllowedPortsMode,

    /// Server-wide default ports, used by `default` and `default_plus` modes
    #[serde(default)]
    pub default_ports: Vec<PortDocument>,

    /// Registered clients
    pub clients: Vec<ClientDocument>,
}

/// One client entry in the YAML document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientDocument {
    /// Human-readable client name, used only for logging
    pub name: String,

    /// Base64-encoded 32-byte Ed25519 public key
    pub ed25519_pubkey_b64: String,

    /// Ports requested by this client; consulted per `allowed_ports_mode`
    #[serde(default)]
    pub ports: Vec<PortDocument>,

    /// Whether the health port is prepended to this client's effective ports
    #[serde(default = "default_include_health_port")]
    pub include_health_port: bool,

    /// Optional expiry; an expired client is treated as unknown
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
}
