//! Persistence traits
//!
//! Methods carry a record-kind prefix so one backend can implement all of
//! them without call-site ambiguity.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Forward, NewForward, NewTunnel, Node, RuleFilter, RuleSpec, Traffic, Tunnel};
use crate::types::{ForwardId, NodeId, NodeStatus, RuleStatus, TunnelId};

/// Remote object names to record on a rule; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRefs {
    pub service_id: Option<String>,
    pub chain_id: Option<String>,
    pub observer_id: Option<String>,
}

/// Node registry
#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn node_get(&self, id: NodeId) -> Result<Node, StoreError>;

    async fn node_list(&self) -> Result<Vec<Node>, StoreError>;

    /// Record a health probe result
    async fn node_set_health(
        &self,
        id: NodeId,
        status: NodeStatus,
        checked_at: u64,
    ) -> Result<(), StoreError>;
}

/// Forward records
#[async_trait]
pub trait ForwardStore: Send + Sync {
    /// Insert a new record in `stopped` state with a fresh ID.
    ///
    /// Fails with [`StoreError::PortTaken`] when another forward on the same
    /// node listens on the port; the check and the insert are one step.
    async fn forward_insert(&self, new: NewForward) -> Result<Forward, StoreError>;

    async fn forward_get(&self, id: ForwardId) -> Result<Forward, StoreError>;

    async fn forward_list(&self, filter: &RuleFilter) -> Result<Vec<Forward>, StoreError>;

    /// Replace the user-editable settings, with the same port rule as insert
    async fn forward_replace_spec(&self, id: ForwardId, spec: RuleSpec)
        -> Result<Forward, StoreError>;

    async fn forward_delete(&self, id: ForwardId) -> Result<(), StoreError>;

    async fn forward_set_status(&self, id: ForwardId, status: RuleStatus)
        -> Result<(), StoreError>;

    async fn forward_set_remote(&self, id: ForwardId, refs: RemoteRefs) -> Result<(), StoreError>;

    /// Overwrite traffic counters
    async fn forward_set_traffic(&self, id: ForwardId, traffic: Traffic)
        -> Result<(), StoreError>;
}

/// Tunnel records
#[async_trait]
pub trait TunnelStore: Send + Sync {
    /// Insert a new record in `stopped` state with a fresh ID.
    ///
    /// Fails with [`StoreError::PortTaken`] when another tunnel entering at
    /// the same node listens on the port; the check and the insert are one
    /// step.
    async fn tunnel_insert(&self, new: NewTunnel, relay_port: u16) -> Result<Tunnel, StoreError>;

    async fn tunnel_get(&self, id: TunnelId) -> Result<Tunnel, StoreError>;

    async fn tunnel_list(&self, filter: &RuleFilter) -> Result<Vec<Tunnel>, StoreError>;

    /// Tunnels whose entry is `node`
    async fn tunnel_list_by_entry(&self, node: NodeId) -> Result<Vec<Tunnel>, StoreError>;

    /// Replace endpoints, settings and relay port, with the same port rule
    /// as insert
    async fn tunnel_replace(
        &self,
        id: TunnelId,
        update: NewTunnel,
        relay_port: u16,
    ) -> Result<Tunnel, StoreError>;

    async fn tunnel_delete(&self, id: TunnelId) -> Result<(), StoreError>;

    async fn tunnel_set_status(&self, id: TunnelId, status: RuleStatus) -> Result<(), StoreError>;

    async fn tunnel_set_remote(&self, id: TunnelId, refs: RemoteRefs) -> Result<(), StoreError>;

    /// Overwrite traffic counters
    async fn tunnel_set_traffic(&self, id: TunnelId, traffic: Traffic) -> Result<(), StoreError>;
}

/// Everything the panel persists
pub trait RuleStore: NodeStore + ForwardStore + TunnelStore {}

impl<T: NodeStore + ForwardStore + TunnelStore> RuleStore for T {}
