//! Firewall backend contract
//!
//! A backend owns one mechanism (`iptables`, `nftables`, ...) for opening
//! and closing a narrow pinhole from a single source address to a set of
//! `(port, protocol)` pairs. Every operation must be idempotent: the
//! manager in [`crate::manager`] calls `open` on every knock, including
//! repeat knocks for an address that is already open.

use std::net::IpAddr;

use async_trait::async_trait;

use openme_core::PortSpec;

use crate::Result;

/// A mechanism for opening and closing kernel firewall rules
///
/// Implementations must restrict themselves to rules they own - a marker
/// comment for `iptables`, a dedicated chain for `nftables` - so the
/// backend never mutates a rule it did not create.
#[async_trait]
pub trait FirewallBackend: Send + Sync {
    /// Open `ports` for `source_ip`
    ///
    /// Must not duplicate rules or fail when called again with identical
    /// arguments.
    async fn open(&self, source_ip: IpAddr, ports: &[PortSpec]) -> Result<()>;

    /// Remove the rules opened by a prior `open` call with the same arguments
    ///
    /// Best-effort: must not fail if the rule is already gone.
    async fn close(&self, source_ip: IpAddr, ports: &[PortSpec]) -> Result<()>;

    /// Identifier for this backend, used in logs
    fn name(&self) -> &'static str;
}
