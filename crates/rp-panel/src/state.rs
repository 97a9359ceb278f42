//! Shared panel state

use std::sync::Arc;

use rp_core::config::PanelConfig;
use rp_core::traits::{AuditSink, RemoteConnector, RuleStore};

use crate::orchestrator::Orchestrator;
use crate::telemetry::TelemetryIngest;

/// State shared by the HTTP handlers
pub struct PanelState {
    /// Configuration
    pub config: PanelConfig,
    /// Nodes, forwards and tunnels
    pub store: Arc<dyn RuleStore>,
    /// Client factory for node management APIs
    pub connector: Arc<dyn RemoteConnector>,
    /// Rule lifecycle
    pub orchestrator: Orchestrator,
    /// Observer report ingestion
    pub telemetry: TelemetryIngest,
}

impl PanelState {
    /// Wire up the orchestrator and telemetry over shared dependencies
    pub fn new(
        config: PanelConfig,
        store: Arc<dyn RuleStore>,
        connector: Arc<dyn RemoteConnector>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let orchestrator = Orchestrator::new(
            Arc::clone(&store),
            Arc::clone(&connector),
            audit,
            config.observer_url(),
        );
        let telemetry = TelemetryIngest::new(Arc::clone(&store));

        Self {
            config,
            store,
            connector,
            orchestrator,
            telemetry,
        }
    }
}
