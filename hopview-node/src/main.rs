// HopView node daemon: gossip serving, exchange rounds, discovery, reporting.

mod config;
mod discovery;
mod failure;
mod gossip;
mod reporter;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use hopview_core::NodeState;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("hopview-node {}", VERSION);
        return Ok(());
    }
    if args.len() < 2 {
        eprintln!("usage: hopview-node <node-count> <node-index>");
        std::process::exit(2);
    }
    let node_count: u32 = args[0].parse().context("node-count must be an integer")?;
    let node_index: u32 = args[1].parse().context("node-index must be an integer")?;
    if node_index >= node_count {
        anyhow::bail!(
            "node-index {} out of range for {} nodes",
            node_index,
            node_count
        );
    }

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cfg = config::load();
    let self_addr = cfg
        .node_addr(node_index)
        .context("bad subnet in config")?;
    let broadcast_addr = cfg.broadcast_addr().context("bad subnet in config")?;
    let node = Arc::new(Mutex::new(NodeState::new(self_addr)));

    tracing::info!(
        node = %self_addr,
        index = node_index,
        nodes = node_count,
        "starting hopview node"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        // Failing to bind either channel is fatal; everything after startup
        // is best-effort.
        let gossip_socket = Arc::new(
            UdpSocket::bind(("0.0.0.0", cfg.gossip_port))
                .await
                .context("cannot bind gossip port")?,
        );
        let discovery_socket = Arc::new(
            discovery::make_broadcast_socket(cfg.discovery_port)
                .await
                .context("cannot bind discovery port")?,
        );
        let mayday_dest = SocketAddr::from((broadcast_addr, cfg.discovery_port));

        tokio::spawn(gossip::run_serve(gossip_socket.clone(), node.clone()));
        tokio::spawn(gossip::run_rounds(
            gossip_socket.clone(),
            node.clone(),
            failure::EchoProbe {
                gossip_port: cfg.gossip_port,
                timeout: failure::PROBE_TIMEOUT,
            },
            discovery_socket.clone(),
            mayday_dest,
            cfg.gossip_port,
        ));
        tokio::spawn(discovery::run_discovery(
            node.clone(),
            discovery_socket,
            broadcast_addr,
            cfg.discovery_port,
        ));
        tokio::spawn(reporter::run_reporter(node.clone()));

        shutdown_signal().await
    })?;
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM (Unix); tasks die with the process.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}
