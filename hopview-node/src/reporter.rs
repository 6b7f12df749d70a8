//! Periodic view snapshot for the external convergence analyzer.

use std::sync::Arc;
use std::time::Duration;

use hopview_core::NodeState;
use tokio::sync::Mutex;
use tracing::info;

pub const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Log the current view on a fixed cadence. The `Current view:` text and the
/// deterministic view rendering are parsed downstream; keep both stable.
pub async fn run_reporter(node: Arc<Mutex<NodeState>>) {
    loop {
        {
            let state = node.lock().await;
            info!("Current view: {}", state.view());
        }
        tokio::time::sleep(REPORT_INTERVAL).await;
    }
}
