//! UDP receive loop
//!
//! Binds one dual-stack-capable UDP socket and spawns a short-lived task
//! per datagram so a slow firewall call never blocks the reader.

use std::net::IpAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::info;

use crate::pipeline::{self, PipelineState};

/// Twice `PACKET_SIZE`; anything longer is a malformed/oversized datagram
/// and caught by `KnockPacket::parse`'s length check without the reader
/// needing its own bound.
const RECV_BUF_SIZE: usize = openme_protocol::PACKET_SIZE * 2;

/// Bind the knock server's UDP socket and serve datagrams until `shutdown` fires
pub async fn run(
    udp_port: u16,
    state: Arc<PipelineState>,
    health_port: u16,
    shutdown: impl std::future::Future<Output = ()>,
) -> anyhow::Result<()> {
    let socket = UdpSocket::bind(("::", udp_port)).await?;
    info!(udp_port, health_port, "openme server listening");

    tokio::pin!(shutdown);
    let mut buf = vec![0u8; RECV_BUF_SIZE];

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                break;
            }
            result = socket.recv_from(&mut buf) => {
                let (len, peer) = result?;
                let datagram = buf[..len].to_vec();
                let state = state.clone();
                // The socket is bound dual-stack, so an IPv4 peer arrives as
                // an IPv4-mapped IPv6 address; canonicalize it back to V4
                // before it reaches a firewall backend that dispatches on
                // `IpAddr` variant.
                let source_ip = match peer.ip() {
                    IpAddr::V6(v6) => v6.to_canonical(),
                    other => other,
                };
                tokio::spawn(pipeline::handle_datagram(state, datagram, source_ip));
            }
        }
    }

    state.manager.close_all().await;
    Ok(())
}
