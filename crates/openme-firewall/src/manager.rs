//! Firewall rule lifecycle manager
//!
//! Wraps a [`FirewallBackend`] with a per-rule expiry timer: `open` resets
//! an existing timer rather than stacking a second one, and the timer's
//! firing is the only path that calls `backend.close`.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

use openme_core::PortSpec;

use crate::backend::FirewallBackend;
use crate::rule_key::RuleKey;
use crate::Result;

/// One rule the manager has opened and is timing out
struct ArmedRule {
    source_ip: IpAddr,
    ports: Vec<PortSpec>,
    timer: JoinHandle<()>,
}

/// Tracks one armed expiry timer per open rule
pub struct FirewallManager {
    backend: Arc<dyn FirewallBackend>,
    knock_timeout: Duration,
    rules: Mutex<HashMap<RuleKey, ArmedRule>>,
}

impl FirewallManager {
    /// Create a manager wrapping `backend`, with rules expiring after `knock_timeout`
    pub fn new(backend: Arc<dyn FirewallBackend>, knock_timeout: Duration) -> Self {
        Self {
            backend,
            knock_timeout,
            rules: Mutex::new(HashMap::new()),
        }
    }

    /// Open `ports` for `source_ip`, arming or resetting its expiry timer
    ///
    /// Returns only after `backend.open` completes. If the backend call
    /// fails, no timer is armed and the error is returned to the caller.
    pub async fn open(self: &Arc<Self>, source_ip: IpAddr, ports: Vec<PortSpec>) -> Result<()> {
        self.backend.open(source_ip, &ports).await?;

        let key = RuleKey::new(source_ip, &ports);

        let mut rules = self.rules.lock();
        if let Some(existing) = rules.remove(&key) {
            existing.timer.abort();
        }

        let manager = self.clone();
        let timeout = self.knock_timeout;
        let timer_key = key.clone();
        let timer_ports = ports.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            manager.expire(timer_key, source_ip, timer_ports).await;
        });
        rules.insert(key, ArmedRule { source_ip, ports, timer });

        info!(%source_ip, backend = self.backend.name(), "firewall rule opened");
        Ok(())
    }

    async fn expire(self: Arc<Self>, key: RuleKey, source_ip: IpAddr, ports: Vec<PortSpec>) {
        if let Err(e) = self.backend.close(source_ip, &ports).await {
            error!(%source_ip, error = %e, "failed to close expired firewall rule");
        } else {
            info!(%source_ip, backend = self.backend.name(), "firewall rule expired");
        }
        self.rules.lock().remove(&key);
    }

    /// Stop all pending timers and best-effort remove every live rule
    ///
    /// Called on shutdown. Timers are cancelled synchronously; the
    /// corresponding `backend.close` calls for each still-armed rule are
    /// awaited before returning.
    pub async fn close_all(&self) {
        let armed: Vec<ArmedRule> = self.rules.lock().drain().map(|(_, v)| v).collect();

        for rule in armed {
            rule.timer.abort();
            if let Err(e) = self.backend.close(rule.source_ip, &rule.ports).await {
                error!(source_ip = %rule.source_ip, error = %e, "failed to close firewall rule during shutdown");
            }
        }
    }

    /// Number of rules with a currently armed timer
    pub fn active_rule_count(&self) -> usize {
        self.rules.lock().len()
    }
}
