//! In-memory [`FirewallBackend`] for manager and server-pipeline tests
//!
//! Records every `open`/`close` call instead of touching the kernel,
//! mirroring how the teacher avoids exercising real network/TLS state in
//! its unit tests.

use std::net::IpAddr;

use async_trait::async_trait;
use parking_lot::Mutex;

use openme_core::PortSpec;

use crate::backend::FirewallBackend;
use crate::Result;

/// Records calls instead of shelling out to a real firewall tool
#[derive(Default)]
pub struct MockBackend {
    opens: Mutex<Vec<(IpAddr, Vec<PortSpec>)>>,
    closes: Mutex<Vec<(IpAddr, Vec<PortSpec>)>>,
}

impl MockBackend {
    /// Construct an empty mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(source_ip, ports)` passed to `open`, in call order
    pub fn open_calls(&self) -> Vec<(IpAddr, Vec<PortSpec>)> {
        self.opens.lock().clone()
    }

    /// Every `(source_ip, ports)` passed to `close`, in call order
    pub fn close_calls(&self) -> Vec<(IpAddr, Vec<PortSpec>)> {
        self.closes.lock().clone()
    }
}

#[async_trait]
impl FirewallBackend for MockBackend {
    async fn open(&self, source_ip: IpAddr, ports: &[PortSpec]) -> Result<()> {
        self.opens.lock().push((source_ip, ports.to_vec()));
        Ok(())
    }

    async fn close(&self, source_ip: IpAddr, ports: &[PortSpec]) -> Result<()> {
        self.closes.lock().push((source_ip, ports.to_vec()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
