//! Canonical rule keys
//!
//! The manager in [`crate::manager`] tracks exactly one armed timer per
//! `(source_ip, ports)` pair. Ports are sorted before the key is built so
//! that two knocks carrying the same port list in a different order (which
//! cannot happen from the registry today, but might from a future config
//! shape) still collapse onto one rule.

use std::fmt::Write as _;
use std::net::IpAddr;

use openme_core::PortSpec;

/// Opaque key identifying one firewall rule set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleKey(String);

impl RuleKey {
    /// Build the canonical key for `(source_ip, ports)`
    pub fn new(source_ip: IpAddr, ports: &[PortSpec]) -> Self {
        let mut sorted: Vec<PortSpec> = ports.to_vec();
        sorted.sort();

        let mut key = source_ip.to_string();
        for port in &sorted {
            let _ = write!(key, "|{port}");
        }
        Self(key)
    }
}

impl std::fmt::Display for RuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openme_core::Protocol;

    #[test]
    fn test_key_stable_under_port_order() {
        let ip: IpAddr = "10.0.0.5".parse().unwrap();
        let a = [PortSpec::new(22, Protocol::Tcp), PortSpec::new(54154, Protocol::Udp)];
        let b = [PortSpec::new(54154, Protocol::Udp), PortSpec::new(22, Protocol::Tcp)];

        assert_eq!(RuleKey::new(ip, &a), RuleKey::new(ip, &b));
    }

    #[test]
    fn test_key_distinguishes_source_ip() {
        let ports = [PortSpec::new(22, Protocol::Tcp)];
        let a = RuleKey::new("10.0.0.5".parse().unwrap(), &ports);
        let b = RuleKey::new("10.0.0.6".parse().unwrap(), &ports);
        assert_ne!(a, b);
    }
}
