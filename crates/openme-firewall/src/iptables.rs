//! `iptables` / `ip6tables` backend
//!
//! Inserts one `INPUT` rule per `(port, protocol)` pair, tagged with a
//! `--comment openme` marker so this backend only ever touches rules it
//! created itself. IPv4 sources go through `iptables`, IPv6 sources
//! through `ip6tables`; the on-wire rule shape is otherwise identical.

use std::net::IpAddr;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use openme_core::PortSpec;

use crate::backend::FirewallBackend;
use crate::{FirewallError, Result};

/// Comment marker inserted into every rule this backend owns
const MARKER: &str = "openme";

/// `iptables`/`ip6tables`-backed [`FirewallBackend`]
#[derive(Debug, Default)]
pub struct IptablesBackend {
    chain: String,
}

impl IptablesBackend {
    /// Construct a backend that manages rules in the `INPUT` chain
    pub fn new() -> Self {
        Self {
            chain: "INPUT".to_string(),
        }
    }

    fn tool_for(source_ip: IpAddr) -> &'static str {
        match source_ip {
            IpAddr::V4(_) => "iptables",
            IpAddr::V6(_) => "ip6tables",
        }
    }

    fn rule_args(&self, source_ip: IpAddr, port: &PortSpec) -> Vec<String> {
        vec![
            "-s".to_string(),
            source_ip.to_string(),
            "-p".to_string(),
            port.proto.to_string(),
            "--dport".to_string(),
            port.port.to_string(),
            "-m".to_string(),
            "comment".to_string(),
            "--comment".to_string(),
            MARKER.to_string(),
            "-j".to_string(),
            "ACCEPT".to_string(),
        ]
    }

    async fn run(tool: &'static str, args: &[String]) -> Result<std::process::ExitStatus> {
        let output = Command::new(tool)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| FirewallError::SpawnFailed(e, tool))?;
        debug!(tool, status = ?output.status, "ran firewall command");
        Ok(output.status)
    }

    /// `iptables -C <chain> <rule>` - exit 0 means the rule already exists
    async fn rule_exists(&self, tool: &'static str, source_ip: IpAddr, port: &PortSpec) -> Result<bool> {
        let mut args = vec!["-C".to_string(), self.chain.clone()];
        args.extend(self.rule_args(source_ip, port));
        let status = Self::run(tool, &args).await?;
        Ok(status.success())
    }
}

#[async_trait]
impl FirewallBackend for IptablesBackend {
    async fn open(&self, source_ip: IpAddr, ports: &[PortSpec]) -> Result<()> {
        let tool = Self::tool_for(source_ip);
        for port in ports {
            if self.rule_exists(tool, source_ip, port).await? {
                continue;
            }
            let mut args = vec!["-I".to_string(), self.chain.clone(), "1".to_string()];
            args.extend(self.rule_args(source_ip, port));
            let status = Self::run(tool, &args).await?;
            if !status.success() {
                return Err(FirewallError::CommandFailed {
                    tool,
                    status: status.code().unwrap_or(-1),
                    stderr: format!("failed to insert rule for {source_ip} {port}"),
                });
            }
        }
        Ok(())
    }

    async fn close(&self, source_ip: IpAddr, ports: &[PortSpec]) -> Result<()> {
        let tool = Self::tool_for(source_ip);
        for port in ports {
            if !self.rule_exists(tool, source_ip, port).await? {
                continue;
            }
            let mut args = vec!["-D".to_string(), self.chain.clone()];
            args.extend(self.rule_args(source_ip, port));
            // Best-effort: a concurrent close or a kernel that already
            // dropped the rule is not an error here.
            let _ = Self::run(tool, &args).await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "iptables"
    }
}
