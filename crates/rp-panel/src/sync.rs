//! Reconciliation loop
//!
//! Every interval the engine fetches the live configuration of each node
//! that is not offline and overwrites any rule status that no longer matches
//! what the node reports. It is the only path that notices a service that
//! died outside the orchestrator's control.
//!
//! Cycles never overlap: a cycle fans out one worker per node and waits for
//! all of them before the next tick is taken.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use rp_core::error::{RemoteError, StoreError};
use rp_core::model::{Node, RuleFilter};
use rp_core::status::{forward_status, tunnel_status};
use rp_core::traits::{RemoteConnector, RuleStore};
use rp_core::types::NodeStatus;
use rp_protocol::ServiceState;

/// Why a node was skipped this cycle
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("fetching live config failed: {0}")]
    Fetch(#[from] RemoteError),

    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of one reconciliation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Nodes polled
    pub nodes: usize,
    /// Nodes skipped after an error
    pub failed: usize,
    /// Rule statuses overwritten
    pub corrected: usize,
}

/// Reconciles the rules of one node against its live configuration
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn RuleStore>,
    connector: Arc<dyn RemoteConnector>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RuleStore>, connector: Arc<dyn RemoteConnector>) -> Self {
        Self { store, connector }
    }

    /// Poll `node` once; returns the number of statuses corrected
    pub async fn reconcile_node(&self, node: &Node) -> Result<usize, SyncError> {
        let client = self.connector.connect(node)?;
        let live = client.get_config().await?;

        let services: HashMap<&str, &ServiceState> = live
            .services
            .iter()
            .map(|s| (s.name.as_str(), s.status.as_ref().map(|st| &st.state).unwrap_or(&STOPPED)))
            .collect();
        let chains: HashSet<&str> = live.chains.iter().map(|c| c.name.as_str()).collect();
        let state_of = |name: &str| services.get(name).copied().unwrap_or(&STOPPED);

        let mut corrected = 0;

        let filter = RuleFilter {
            node_id: Some(node.id),
            ..Default::default()
        };
        for forward in self.store.forward_list(&filter).await? {
            let observed = forward_status(state_of(&forward.expected_service()));
            if observed == forward.status {
                continue;
            }
            tracing::info!(
                "Forward {} on {} drifted: {} -> {}",
                forward.id,
                node.name,
                forward.status,
                observed
            );
            match self.store.forward_set_status(forward.id, observed).await {
                Ok(()) => corrected += 1,
                Err(StoreError::NotFound(_)) => {
                    tracing::debug!("Forward {} deleted during reconciliation", forward.id)
                }
                Err(err) => return Err(err.into()),
            }
        }

        for tunnel in self.store.tunnel_list_by_entry(node.id).await? {
            let chain_present = chains.contains(tunnel.expected_chain().as_str());
            let observed = tunnel_status(state_of(&tunnel.expected_service()), chain_present);
            if observed == tunnel.status {
                continue;
            }
            tracing::info!(
                "Tunnel {} on {} drifted: {} -> {} (chain present: {})",
                tunnel.id,
                node.name,
                tunnel.status,
                observed,
                chain_present
            );
            match self.store.tunnel_set_status(tunnel.id, observed).await {
                Ok(()) => corrected += 1,
                Err(StoreError::NotFound(_)) => {
                    tracing::debug!("Tunnel {} deleted during reconciliation", tunnel.id)
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(corrected)
    }
}

static STOPPED: ServiceState = ServiceState::Stopped;

/// Periodic reconciliation task
pub struct SyncEngine {
    reconciler: Reconciler,
    interval: Duration,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl SyncEngine {
    /// Create an engine; cancelling `parent` also stops it
    pub fn new(
        store: Arc<dyn RuleStore>,
        connector: Arc<dyn RemoteConnector>,
        interval: Duration,
        parent: &CancellationToken,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(store, connector),
            interval,
            cancel: parent.child_token(),
            tracker: TaskTracker::new(),
        }
    }

    /// Spawn the loop. The first cycle runs immediately.
    pub fn start(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        self.tracker.spawn(async move { engine.run().await });
    }

    /// Stop scheduling cycles and wait for in-flight workers
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("Sync engine stopped");
    }

    async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Starting sync engine (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!("Sync engine shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    if report.corrected > 0 || report.failed > 0 {
                        tracing::debug!(
                            "Sync cycle: {} nodes, {} failed, {} corrected",
                            report.nodes,
                            report.failed,
                            report.corrected
                        );
                    }
                }
            }
        }
    }

    /// Run one cycle over every node that is not offline
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let nodes = match self.reconciler.store.node_list().await {
            Ok(nodes) => nodes,
            Err(err) => {
                tracing::error!("Sync cycle could not list nodes: {}", err);
                return report;
            }
        };

        let mut workers = Vec::new();
        for node in nodes {
            if node.status == NodeStatus::Offline || self.cancel.is_cancelled() {
                continue;
            }
            let reconciler = self.reconciler.clone();
            workers.push(self.tracker.spawn(async move {
                let result = reconciler.reconcile_node(&node).await;
                if let Err(err) = &result {
                    tracing::warn!("Skipping node {} this cycle: {}", node.name, err);
                }
                result
            }));
        }

        for worker in futures::future::join_all(workers).await {
            report.nodes += 1;
            match worker {
                Ok(Ok(corrected)) => report.corrected += corrected,
                Ok(Err(_)) => report.failed += 1,
                Err(err) => {
                    tracing::error!("Sync worker panicked: {}", err);
                    report.failed += 1;
                }
            }
        }

        report
    }
}
