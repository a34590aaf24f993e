//! `nftables` backend
//!
//! Owns a dedicated chain, `openme`, under `table inet filter`, created
//! idempotently on first use. Rules are added with `nft add rule` (which is
//! not itself idempotent) guarded by a prior `nft -a list chain` scan, and
//! removed by handle rather than by rule text so a concurrent process
//! cannot be tricked into deleting the wrong line.

use std::net::IpAddr;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use openme_core::PortSpec;

use crate::backend::FirewallBackend;
use crate::{FirewallError, Result};

const FAMILY: &str = "inet";
const TABLE: &str = "filter";
const CHAIN: &str = "openme";

/// `nftables`-backed [`FirewallBackend`]
#[derive(Debug, Default)]
pub struct NftablesBackend;

impl NftablesBackend {
    /// Construct a backend bound to `inet filter openme`
    pub fn new() -> Self {
        Self
    }

    async fn run(args: &[&str]) -> Result<(std::process::ExitStatus, String)> {
        let output = Command::new("nft")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| FirewallError::SpawnFailed(e, "nft"))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(status = ?output.status, "ran nft command");
        Ok((output.status, stdout))
    }

    /// `nft add table` / `nft add chain` are idempotent - they are no-ops
    /// if the object already exists.
    async fn ensure_chain(&self) -> Result<()> {
        let (status, _) = Self::run(&["add", "table", FAMILY, TABLE]).await?;
        if !status.success() {
            return Err(FirewallError::CommandFailed {
                tool: "nft",
                status: status.code().unwrap_or(-1),
                stderr: format!("failed to ensure table {FAMILY} {TABLE}"),
            });
        }

        let chain_spec = "{ type filter hook input priority 0; }";
        let (status, _) = Self::run(&[
            "add", "chain", FAMILY, TABLE, CHAIN, chain_spec,
        ])
        .await?;
        if !status.success() {
            return Err(FirewallError::CommandFailed {
                tool: "nft",
                status: status.code().unwrap_or(-1),
                stderr: format!("failed to ensure chain {FAMILY} {TABLE} {CHAIN}"),
            });
        }
        Ok(())
    }

    fn rule_expr(source_ip: IpAddr, port: &PortSpec) -> String {
        let addr_family = match source_ip {
            IpAddr::V4(_) => "ip",
            IpAddr::V6(_) => "ip6",
        };
        format!(
            "{addr_family} saddr {source_ip} {} dport {} accept",
            port.proto, port.port
        )
    }

    /// List rules in the managed chain as `(handle, rule_text)` pairs
    async fn list_rules(&self) -> Result<Vec<(String, String)>> {
        let (status, stdout) = Self::run(&["-a", "list", "chain", FAMILY, TABLE, CHAIN]).await?;
        if !status.success() {
            // Chain does not exist yet - nothing to list.
            return Ok(Vec::new());
        }

        let mut rules = Vec::new();
        for line in stdout.lines() {
            let line = line.trim();
            let Some(idx) = line.rfind("# handle ") else {
                continue;
            };
            let (rule_text, handle_part) = line.split_at(idx);
            let handle = handle_part.trim_start_matches("# handle ").trim();
            rules.push((handle.to_string(), rule_text.trim().to_string()));
        }
        Ok(rules)
    }

    async fn find_handle(&self, expr: &str) -> Result<Option<String>> {
        let rules = self.list_rules().await?;
        Ok(rules
            .into_iter()
            .find(|(_, text)| text == expr)
            .map(|(handle, _)| handle))
    }
}

#[async_trait]
impl FirewallBackend for NftablesBackend {
    async fn open(&self, source_ip: IpAddr, ports: &[PortSpec]) -> Result<()> {
        self.ensure_chain().await?;

        for port in ports {
            let expr = Self::rule_expr(source_ip, port);
            if self.find_handle(&expr).await?.is_some() {
                continue;
            }

            let (status, _) = Self::run(&["add", "rule", FAMILY, TABLE, CHAIN, &expr]).await?;
            if !status.success() {
                return Err(FirewallError::CommandFailed {
                    tool: "nft",
                    status: status.code().unwrap_or(-1),
                    stderr: format!("failed to add rule: {expr}"),
                });
            }
        }
        Ok(())
    }

    async fn close(&self, source_ip: IpAddr, ports: &[PortSpec]) -> Result<()> {
        for port in ports {
            let expr = Self::rule_expr(source_ip, port);
            let Some(handle) = self.find_handle(&expr).await? else {
                continue;
            };
            // Best-effort: the rule may already be gone by the time we delete it.
            let _ = Self::run(&["delete", "rule", FAMILY, TABLE, CHAIN, "handle", &handle]).await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "nftables"
    }
}
