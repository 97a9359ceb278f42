//! Lifecycle orchestration for forwards and tunnels
//!
//! The orchestrator owns every write to a rule's `status` outside of
//! reconciliation. Start and stop translate a stored rule into the remote
//! calls needed on its node; create/update/delete guard the invariants that
//! make those calls possible later (free port, distinct tunnel ends, exit
//! relay port).

mod forward;
mod tunnel;

use std::sync::Arc;

use rp_core::error::{PanelError, RemoteError, RemoteStep, Resource, StoreError};
use rp_core::model::{Node, RuleSpec};
use rp_core::naming;
use rp_core::traits::{
    AuditAction, AuditRecord, AuditSink, RemoteConnector, RemoteControl, ResourceKind, RuleStore,
};
use rp_core::types::NodeId;
use rp_protocol::{ObserverConfig, ServiceConfig};

/// How often services push stats to their observer
pub const OBSERVER_PERIOD: &str = "5s";

/// Drives forwards and tunnels between stopped and running
pub struct Orchestrator {
    store: Arc<dyn RuleStore>,
    connector: Arc<dyn RemoteConnector>,
    audit: Arc<dyn AuditSink>,
    /// Telemetry delivery URL; `None` runs rules without an observer
    observer_url: Option<String>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn RuleStore>,
        connector: Arc<dyn RemoteConnector>,
        audit: Arc<dyn AuditSink>,
        observer_url: Option<String>,
    ) -> Self {
        Self {
            store,
            connector,
            audit,
            observer_url,
        }
    }

    /// Look up a node, reporting a miss as `as_resource`
    async fn find_node(
        &self,
        id: NodeId,
        as_resource: fn(NodeId) -> Resource,
    ) -> Result<Node, PanelError> {
        match self.store.node_get(id).await {
            Ok(node) => Ok(node),
            Err(StoreError::NotFound(_)) => Err(PanelError::NotFound(as_resource(id))),
            Err(err) => Err(err.into()),
        }
    }

    /// Look up a node that must be online before any remote call
    async fn online_node(
        &self,
        id: NodeId,
        as_resource: fn(NodeId) -> Resource,
    ) -> Result<Node, PanelError> {
        let node = self.find_node(id, as_resource).await?;
        if !node.is_online() {
            return Err(PanelError::NodeUnavailable {
                node: node.id,
                status: node.status,
            });
        }
        Ok(node)
    }

    fn connect(&self, node: &Node) -> Result<Arc<dyn RemoteControl>, PanelError> {
        self.connector.connect(node).map_err(|e| {
            tracing::error!("No client for node {} ({}): {}", node.name, node.api_url, e);
            PanelError::RemoteFailed(RemoteStep::Connect)
        })
    }

    /// Create the observer for a rule, reusing one that already exists.
    ///
    /// Returns `None` when no telemetry URL is configured.
    async fn ensure_observer(
        &self,
        client: &dyn RemoteControl,
        node: &Node,
        rule_id: u64,
    ) -> Result<Option<String>, RemoteError> {
        let Some(url) = &self.observer_url else {
            tracing::debug!(
                "No public URL configured, rule {} on {} runs without telemetry",
                rule_id,
                node.name
            );
            return Ok(None);
        };

        let name = naming::observer(&node.name, rule_id);
        match client.create_observer(&ObserverConfig::webhook(&name, url)).await {
            Ok(()) => Ok(Some(name)),
            Err(RemoteError::Duplicate(_)) => {
                tracing::debug!("Observer {} already exists on {}, reusing", name, node.name);
                Ok(Some(name))
            }
            Err(err) => Err(err),
        }
    }

    /// Persist the node's running config; failures are only logged
    async fn persist_node_config(&self, client: &dyn RemoteControl, node: &Node) {
        if let Err(err) = client.save_config().await {
            tracing::warn!("Failed to save config on node {}: {}", node.name, err);
        }
    }

    async fn record_audit(
        &self,
        action: AuditAction,
        resource: ResourceKind,
        id: u64,
        detail: String,
        success: bool,
    ) {
        self.audit
            .record(AuditRecord::new(action, resource, id, detail, success))
            .await;
    }
}

/// Service declaration for a rule
fn build_service(name: &str, spec: &RuleSpec, observer: Option<&str>) -> ServiceConfig {
    let mut service = ServiceConfig::forward(
        name,
        spec.listen_port,
        spec.protocol.as_str(),
        &spec.targets,
        spec.effective_strategy().selector_name(),
    );
    if spec.enable_tls {
        service = service.with_tls();
    }
    if let Some(observer) = observer {
        service = service.with_observer(observer, OBSERVER_PERIOD);
    }
    service
}
