//! Node health monitoring
//!
//! Probes every registered node with a live-config fetch and records the
//! outcome as the node's status. The orchestrator refuses to touch nodes
//! that are not `online`, and the sync engine skips `offline` ones.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rp_core::error::RemoteError;
use rp_core::model::Node;
use rp_core::time::current_time_millis;
use rp_core::traits::{RemoteConnector, RuleStore};
use rp_core::types::NodeStatus;

/// Monitors node health via periodic probes
pub struct HealthMonitor {
    store: Arc<dyn RuleStore>,
    connector: Arc<dyn RemoteConnector>,
    /// Probe interval
    pub interval: Duration,
}

impl HealthMonitor {
    /// Create a new health monitor
    pub fn new(
        store: Arc<dyn RuleStore>,
        connector: Arc<dyn RemoteConnector>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            connector,
            interval,
        }
    }

    /// Start probing until `cancel` fires. The first round runs immediately.
    pub fn spawn_monitor(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            tracing::info!("Starting node health monitor (interval: {:?})", self.interval);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::info!("Health monitor shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.probe_all().await;
                    }
                }
            }
        })
    }

    /// Probe every node concurrently; returns how many are online
    pub async fn probe_all(&self) -> usize {
        let nodes = match self.store.node_list().await {
            Ok(nodes) => nodes,
            Err(err) => {
                tracing::error!("Health probe could not list nodes: {}", err);
                return 0;
            }
        };

        let results = futures::future::join_all(nodes.iter().map(|node| self.probe(node))).await;
        results
            .into_iter()
            .filter(|status| *status == NodeStatus::Online)
            .count()
    }

    /// Probe one node and record the result
    pub async fn probe(&self, node: &Node) -> NodeStatus {
        let status = match self.connector.connect(node) {
            Ok(client) => classify_probe(client.get_config().await.map(|_| ())),
            Err(err) => classify_probe(Err(err)),
        };

        if status != node.status {
            tracing::info!("Node {} is now {} (was {})", node.name, status, node.status);
        }
        if let Err(err) = self
            .store
            .node_set_health(node.id, status, current_time_millis())
            .await
        {
            tracing::warn!("Failed to record health of node {}: {}", node.name, err);
        }
        status
    }
}

/// Status implied by a probe result
fn classify_probe(result: Result<(), RemoteError>) -> NodeStatus {
    match result {
        Ok(()) => NodeStatus::Online,
        Err(err) if err.is_unreachable() => {
            tracing::debug!("Probe failed: {}", err);
            NodeStatus::Offline
        }
        Err(err) => {
            tracing::debug!("Probe answered with error: {}", err);
            NodeStatus::Error
        }
    }
}
