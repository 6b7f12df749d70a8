//! LAN discovery: periodic ANNOUNCE broadcast; listener that grows the peer
//! directory and applies MAYDAY evictions from other nodes.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use hopview_core::{DiscoveryMessage, NodeState};
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const ANNOUNCE_INTERVAL: Duration = Duration::from_secs(5);

/// Bind the shared discovery socket. Broadcast-capable: the announce loop and
/// the mayday path both send through it.
pub async fn make_broadcast_socket(discovery_port: u16) -> std::io::Result<UdpSocket> {
    let socket = UdpSocket::bind(("0.0.0.0", discovery_port)).await?;
    socket.set_broadcast(true)?;
    Ok(socket)
}

pub async fn run_discovery(
    node: Arc<Mutex<NodeState>>,
    socket: Arc<UdpSocket>,
    broadcast_addr: Ipv4Addr,
    discovery_port: u16,
) -> std::io::Result<()> {
    let send_socket = socket.clone();
    let announce_task = tokio::spawn(async move {
        announce_loop(send_socket, broadcast_addr, discovery_port).await
    });
    let listen_task = tokio::spawn(async move { listen_loop(socket, node).await });
    let _ = tokio::try_join!(announce_task, listen_task);
    Ok(())
}

async fn announce_loop(
    socket: Arc<UdpSocket>,
    broadcast_addr: Ipv4Addr,
    discovery_port: u16,
) -> std::io::Result<()> {
    let dest = SocketAddr::from((broadcast_addr, discovery_port));
    let payload = DiscoveryMessage::Announce.encode();
    loop {
        if let Err(e) = socket.send_to(payload.as_bytes(), dest).await {
            warn!(error = %e, "announce broadcast failed");
        }
        tokio::time::sleep(ANNOUNCE_INTERVAL).await;
    }
}

async fn listen_loop(
    socket: Arc<UdpSocket>,
    node: Arc<Mutex<NodeState>>,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; 1024];
    loop {
        let (n, from) = socket.recv_from(&mut buf).await?;
        let text = match std::str::from_utf8(&buf[..n]) {
            Ok(t) => t,
            Err(_) => {
                warn!(from = %from, "dropping non-text discovery datagram");
                continue;
            }
        };
        let msg = match DiscoveryMessage::parse(text) {
            Ok(m) => m,
            Err(e) => {
                warn!(from = %from, error = %e, "dropping malformed discovery datagram");
                continue;
            }
        };
        match msg {
            DiscoveryMessage::Announce => {
                // Membership only; distances travel on the gossip channel.
                let IpAddr::V4(sender) = from.ip() else {
                    continue;
                };
                let mut state = node.lock().await;
                if state.on_announce(sender) {
                    info!(peer = %sender, peers = state.peers().len(), "peer discovered");
                }
            }
            DiscoveryMessage::Mayday(down) => {
                let evicted = node.lock().await.evict(down);
                if evicted {
                    warn!(peer = %down, "node down, removed from view");
                }
            }
        }
    }
}
