//! Reachability probing, RTT peer ranking, and cooperative eviction.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hopview_core::{decode_packet, encode_packet, DiscoveryMessage, GossipPacket, NodeState};
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Bounded-time reachability probe: address to round-trip time, or `None`
/// when the peer does not answer within the deadline.
pub trait Prober: Send + Sync {
    fn probe(&self, addr: Ipv4Addr) -> impl Future<Output = Option<Duration>> + Send;
}

/// Probes by timing a pull request against the peer's gossip port from a
/// throwaway socket. The reply view is discarded; only the latency matters.
pub struct EchoProbe {
    pub gossip_port: u16,
    pub timeout: Duration,
}

impl Prober for EchoProbe {
    async fn probe(&self, addr: Ipv4Addr) -> Option<Duration> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await.ok()?;
        let request = encode_packet(&GossipPacket::Pull).ok()?;
        let dest = SocketAddr::from((addr, self.gossip_port));
        let started = Instant::now();
        socket.send_to(&request, dest).await.ok()?;
        let mut buf = vec![0u8; 64 * 1024];
        match tokio::time::timeout(self.timeout, socket.recv_from(&mut buf)).await {
            Ok(Ok((n, _))) if decode_packet(&buf[..n]).is_ok() => Some(started.elapsed()),
            _ => None,
        }
    }
}

/// Probe every directory entry in turn and sort the survivors by ascending
/// RTT; the result is the round's ranked reachable peer list. A failed probe
/// is a membership event: the peer is evicted and a mayday is broadcast so
/// other nodes evict it too.
pub async fn rank_reachable_peers<P: Prober>(
    node: &Arc<Mutex<NodeState>>,
    prober: &P,
    discovery: &UdpSocket,
    mayday_dest: SocketAddr,
) -> Vec<(Ipv4Addr, Duration)> {
    let candidates = node.lock().await.peers();
    let mut ranked = Vec::new();
    for addr in candidates {
        match prober.probe(addr).await {
            Some(rtt) => ranked.push((addr, rtt)),
            None => {
                warn!(peer = %addr, "unreachable peer, evicting");
                node.lock().await.evict(addr);
                broadcast_mayday(discovery, mayday_dest, addr).await;
            }
        }
    }
    ranked.sort_by_key(|&(_, rtt)| rtt);
    if let Some(&(best, rtt)) = ranked.first() {
        info!(peer = %best, rtt_us = rtt.as_micros() as u64, "closest peer");
    }
    ranked
}

pub async fn broadcast_mayday(socket: &UdpSocket, dest: SocketAddr, down: Ipv4Addr) {
    let payload = DiscoveryMessage::Mayday(down).encode();
    if let Err(e) = socket.send_to(payload.as_bytes(), dest).await {
        warn!(peer = %down, error = %e, "mayday broadcast failed");
    }
}
