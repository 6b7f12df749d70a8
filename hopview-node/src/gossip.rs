//! Gossip engine: the datagram serve path and the periodic exchange rounds.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hopview_core::{decode_packet, encode_packet, GossipPacket, NodeState};
use rand::Rng;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::failure::{self, Prober};

/// Backoff when a round finds no reachable peer.
pub const EMPTY_ROUND_BACKOFF: Duration = Duration::from_secs(2);
/// Randomized inter-round sleep range; desynchronizes rounds across nodes.
const ROUND_SLEEP_MIN_MS: u64 = 1000;
const ROUND_SLEEP_MAX_MS: u64 = 3000;

/// Serve the gossip socket: answer pulls with the current view, fold pushes
/// into it. The round loop sends through this same socket, so pull replies
/// come back here and merge like any other push.
pub async fn run_serve(
    socket: Arc<UdpSocket>,
    node: Arc<Mutex<NodeState>>,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let (n, from) = socket.recv_from(&mut buf).await?;
        let packet = match decode_packet(&buf[..n]) {
            Ok(p) => p,
            Err(e) => {
                warn!(from = %from, error = %e, "dropping undecodable gossip datagram");
                continue;
            }
        };
        match packet {
            GossipPacket::Pull => {
                info!(from = %from, "recv pull");
                let reply = node.lock().await.snapshot();
                match encode_packet(&GossipPacket::Push(reply.clone())) {
                    Ok(bytes) => {
                        if let Err(e) = socket.send_to(&bytes, from).await {
                            warn!(to = %from, error = %e, "push reply failed");
                        } else {
                            info!(to = %from, view = %reply, "send push reply");
                        }
                    }
                    Err(e) => warn!(error = %e, "push reply encode failed"),
                }
            }
            GossipPacket::Push(view) => {
                info!(from = %from, view = %view, "recv push");
                let mut state = node.lock().await;
                let merged = state.on_push(&view);
                info!(view = %merged, "merged view");
            }
        }
    }
}

/// One exchange round per iteration: rank the reachable peers, pick push or
/// pull uniformly at random for the whole round, contact every ranked peer
/// closest-first, then sleep a randomized interval. Send failures are logged
/// and skipped; the next round retries.
pub async fn run_rounds<P: Prober>(
    socket: Arc<UdpSocket>,
    node: Arc<Mutex<NodeState>>,
    prober: P,
    discovery: Arc<UdpSocket>,
    mayday_dest: SocketAddr,
    gossip_port: u16,
) -> std::io::Result<()> {
    loop {
        let ranked =
            failure::rank_reachable_peers(&node, &prober, &discovery, mayday_dest).await;
        if ranked.is_empty() {
            info!("no reachable peers, skipping gossip round");
            tokio::time::sleep(EMPTY_ROUND_BACKOFF).await;
            continue;
        }

        let push_mode = rand::thread_rng().gen_bool(0.5);
        let (payload, sent_view) = if push_mode {
            let view = node.lock().await.snapshot();
            match encode_packet(&GossipPacket::Push(view.clone())) {
                Ok(bytes) => (bytes, Some(view)),
                Err(e) => {
                    warn!(error = %e, "push encode failed, skipping round");
                    tokio::time::sleep(EMPTY_ROUND_BACKOFF).await;
                    continue;
                }
            }
        } else {
            match encode_packet(&GossipPacket::Pull) {
                Ok(bytes) => (bytes, None),
                Err(e) => {
                    warn!(error = %e, "pull encode failed, skipping round");
                    tokio::time::sleep(EMPTY_ROUND_BACKOFF).await;
                    continue;
                }
            }
        };

        for &(peer, _rtt) in &ranked {
            let dest = SocketAddr::from((peer, gossip_port));
            match socket.send_to(&payload, dest).await {
                Err(e) => warn!(to = %peer, error = %e, "gossip send failed"),
                Ok(_) => match &sent_view {
                    Some(view) => info!(to = %peer, view = %view, "send push"),
                    None => info!(to = %peer, "send pull"),
                },
            }
        }

        let sleep_ms = rand::thread_rng().gen_range(ROUND_SLEEP_MIN_MS..=ROUND_SLEEP_MAX_MS);
        tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::EchoProbe;
    use hopview_core::View;
    use std::net::Ipv4Addr;

    fn addr(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    async fn spawn_serve(node: Arc<Mutex<NodeState>>) -> SocketAddr {
        let socket = Arc::new(UdpSocket::bind(("127.0.0.1", 0)).await.unwrap());
        let local = socket.local_addr().unwrap();
        tokio::spawn(run_serve(socket, node));
        local
    }

    /// Pull against {X:0, Y:1} is answered with exactly that view and leaves
    /// the serving node's state unchanged.
    #[tokio::test]
    async fn pull_is_answered_with_snapshot() {
        let node = Arc::new(Mutex::new(NodeState::new(addr(1))));
        node.lock()
            .await
            .on_push(&[(addr(2), 0)].into_iter().collect());
        let serve_addr = spawn_serve(node.clone()).await;

        let client = UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        let request = encode_packet(&GossipPacket::Pull).unwrap();
        client.send_to(&request, serve_addr).await.unwrap();

        let mut buf = [0u8; 2048];
        let (n, _) = tokio::time::timeout(Duration::from_secs(1), client.recv_from(&mut buf))
            .await
            .expect("no pull reply")
            .unwrap();
        let expected: View = [(addr(1), 0), (addr(2), 1)].into_iter().collect();
        match decode_packet(&buf[..n]).unwrap() {
            GossipPacket::Push(view) => assert_eq!(view, expected),
            GossipPacket::Pull => panic!("expected Push reply"),
        }
        assert_eq!(node.lock().await.view(), &expected);
    }

    /// A received push is incremented and merged into the view.
    #[tokio::test]
    async fn push_is_merged_with_incremented_hops() {
        let node = Arc::new(Mutex::new(NodeState::new(addr(1))));
        let serve_addr = spawn_serve(node.clone()).await;

        let client = UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        let payload: View = [(addr(1), 0), (addr(2), 0)].into_iter().collect();
        let packet = encode_packet(&GossipPacket::Push(payload)).unwrap();
        client.send_to(&packet, serve_addr).await.unwrap();

        for _ in 0..100 {
            if node.lock().await.view().get(&addr(2)) == Some(1) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let state = node.lock().await;
        assert_eq!(state.view().get(&addr(1)), Some(0));
        assert_eq!(state.view().get(&addr(2)), Some(1));
    }

    #[tokio::test]
    async fn undecodable_datagram_is_dropped() {
        let node = Arc::new(Mutex::new(NodeState::new(addr(1))));
        let serve_addr = spawn_serve(node.clone()).await;

        let client = UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        client.send_to(&[0xff; 32], serve_addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(node.lock().await.view().len(), 1);
    }

    /// The echo prober measures a live serve loop and reports a latency.
    #[tokio::test]
    async fn echo_probe_measures_live_peer() {
        let node = Arc::new(Mutex::new(NodeState::new(addr(1))));
        let serve_addr = spawn_serve(node).await;
        let prober = EchoProbe {
            gossip_port: serve_addr.port(),
            timeout: Duration::from_secs(1),
        };
        let rtt = prober.probe("127.0.0.1".parse().unwrap()).await;
        assert!(rtt.is_some());
    }
}
