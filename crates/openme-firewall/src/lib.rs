//! openme firewall: backend variants and the rule lifecycle manager
//!
//! A [`FirewallBackend`] opens and closes a narrow pinhole for one
//! `(source_ip, ports)` tuple; [`FirewallManager`] attaches an expiry
//! timer to each opened rule and is the only caller that ever invokes
//! `close`. The server never talks to a backend directly.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod backend;
pub mod error;
pub mod iptables;
pub mod manager;
pub mod nftables;
pub mod rule_key;
pub mod testing;

pub use backend::FirewallBackend;
pub use error::{FirewallError, Result};
pub use iptables::IptablesBackend;
pub use manager::FirewallManager;
pub use nftables::NftablesBackend;
pub use rule_key::RuleKey;

use serde::{Deserialize, Serialize};

/// Which concrete backend a deployment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallKind {
    /// `iptables`/`ip6tables`
    Iptables,
    /// `nftables`
    Nftables,
}

impl FirewallKind {
    /// Construct the concrete backend this kind names
    pub fn build(self) -> std::sync::Arc<dyn FirewallBackend> {
        match self {
            FirewallKind::Iptables => std::sync::Arc::new(IptablesBackend::new()),
            FirewallKind::Nftables => std::sync::Arc::new(NftablesBackend::new()),
        }
    }
}

impl std::fmt::Display for FirewallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FirewallKind::Iptables => write!(f, "iptables"),
            FirewallKind::Nftables => write!(f, "nftables"),
        }
    }
}
