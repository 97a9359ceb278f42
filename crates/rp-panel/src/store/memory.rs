//! In-memory store
//!
//! Nodes are seeded from configuration; forwards and tunnels live for the
//! lifetime of the process. Each record sits behind its own map shard so
//! writes to distinct rules never contend. Inserts and replacements that
//! claim a listen port are serialized so two rules never end up sharing one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use dashmap::DashMap;

use rp_core::config::NodeProfile;
use rp_core::error::{Resource, StoreError};
use rp_core::model::{Forward, NewForward, NewTunnel, Node, RuleFilter, RuleSpec, Traffic, Tunnel};
use rp_core::time::current_time_millis;
use rp_core::traits::{ForwardStore, NodeStore, RemoteRefs, TunnelStore};
use rp_core::types::{ForwardId, NodeId, NodeStatus, RuleStatus, TunnelId};

/// Store backed by concurrent hash maps
pub struct MemoryStore {
    nodes: DashMap<NodeId, Node>,
    forwards: DashMap<ForwardId, Forward>,
    tunnels: DashMap<TunnelId, Tunnel>,
    next_forward: AtomicU64,
    next_tunnel: AtomicU64,
    admission: Mutex<()>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            forwards: DashMap::new(),
            tunnels: DashMap::new(),
            next_forward: AtomicU64::new(1),
            next_tunnel: AtomicU64::new(1),
            admission: Mutex::new(()),
        }
    }

    /// Create a store with nodes from configuration.
    ///
    /// IDs follow file order starting at 1; every node starts `offline`
    /// until the health monitor has probed it.
    pub fn with_nodes(profiles: &[NodeProfile]) -> Self {
        let store = Self::new();
        for (index, profile) in profiles.iter().enumerate() {
            store.insert_node(Node {
                id: NodeId(index as u64 + 1),
                name: profile.name.clone(),
                api_url: profile.api_url.clone(),
                username: profile.username.clone(),
                password: profile.password.clone(),
                status: NodeStatus::Offline,
                relay_port: profile.relay_port,
                last_check_at: None,
            });
        }
        store
    }

    /// Add or replace a node
    pub fn insert_node(&self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Number of registered nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Held across a port check and the write that depends on it
    fn admit(&self) -> MutexGuard<'_, ()> {
        self.admission.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn claim_forward_port(
        &self,
        node: NodeId,
        port: u16,
        exclude: Option<ForwardId>,
    ) -> Result<(), StoreError> {
        let taken = self.forwards.iter().any(|f| {
            f.node_id == node && f.spec.listen_port == port && Some(f.id) != exclude
        });
        if taken {
            return Err(StoreError::PortTaken { node, port });
        }
        Ok(())
    }

    fn claim_tunnel_port(
        &self,
        node: NodeId,
        port: u16,
        exclude: Option<TunnelId>,
    ) -> Result<(), StoreError> {
        let taken = self.tunnels.iter().any(|t| {
            t.entry_node_id == node && t.spec.listen_port == port && Some(t.id) != exclude
        });
        if taken {
            return Err(StoreError::PortTaken { node, port });
        }
        Ok(())
    }

    fn modify_forward(
        &self,
        id: ForwardId,
        apply: impl FnOnce(&mut Forward),
    ) -> Result<Forward, StoreError> {
        let mut entry = self
            .forwards
            .get_mut(&id)
            .ok_or(StoreError::NotFound(Resource::Forward(id)))?;
        apply(&mut entry);
        entry.updated_at = current_time_millis();
        Ok(entry.clone())
    }

    fn modify_tunnel(
        &self,
        id: TunnelId,
        apply: impl FnOnce(&mut Tunnel),
    ) -> Result<Tunnel, StoreError> {
        let mut entry = self
            .tunnels
            .get_mut(&id)
            .ok_or(StoreError::NotFound(Resource::Tunnel(id)))?;
        apply(&mut entry);
        entry.updated_at = current_time_millis();
        Ok(entry.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_refs(
    refs: RemoteRefs,
    service_id: &mut Option<String>,
    chain_id: Option<&mut Option<String>>,
    observer_id: &mut Option<String>,
) {
    if let Some(service) = refs.service_id {
        *service_id = Some(service);
    }
    if let (Some(chain), Some(slot)) = (refs.chain_id, chain_id) {
        *slot = Some(chain);
    }
    if let Some(observer) = refs.observer_id {
        *observer_id = Some(observer);
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn node_get(&self, id: NodeId) -> Result<Node, StoreError> {
        self.nodes
            .get(&id)
            .map(|n| n.clone())
            .ok_or(StoreError::NotFound(Resource::Node(id)))
    }

    async fn node_list(&self) -> Result<Vec<Node>, StoreError> {
        let mut nodes: Vec<Node> = self.nodes.iter().map(|n| n.clone()).collect();
        nodes.sort_by_key(|n| n.id);
        Ok(nodes)
    }

    async fn node_set_health(
        &self,
        id: NodeId,
        status: NodeStatus,
        checked_at: u64,
    ) -> Result<(), StoreError> {
        let mut node = self
            .nodes
            .get_mut(&id)
            .ok_or(StoreError::NotFound(Resource::Node(id)))?;
        node.status = status;
        node.last_check_at = Some(checked_at);
        Ok(())
    }
}

#[async_trait]
impl ForwardStore for MemoryStore {
    async fn forward_insert(&self, new: NewForward) -> Result<Forward, StoreError> {
        let _admission = self.admit();
        self.claim_forward_port(new.node_id, new.spec.listen_port, None)?;

        let id = ForwardId(self.next_forward.fetch_add(1, Ordering::Relaxed));
        let now = current_time_millis();
        let forward = Forward {
            id,
            node_id: new.node_id,
            spec: new.spec,
            status: RuleStatus::Stopped,
            service_id: None,
            observer_id: None,
            traffic: Traffic::default(),
            created_at: now,
            updated_at: now,
        };
        self.forwards.insert(id, forward.clone());
        Ok(forward)
    }

    async fn forward_get(&self, id: ForwardId) -> Result<Forward, StoreError> {
        self.forwards
            .get(&id)
            .map(|f| f.clone())
            .ok_or(StoreError::NotFound(Resource::Forward(id)))
    }

    async fn forward_list(&self, filter: &RuleFilter) -> Result<Vec<Forward>, StoreError> {
        let mut forwards: Vec<Forward> = self
            .forwards
            .iter()
            .filter(|f| filter.matches_forward(f))
            .map(|f| f.clone())
            .collect();
        forwards.sort_by_key(|f| f.id);
        Ok(forwards)
    }

    async fn forward_replace_spec(
        &self,
        id: ForwardId,
        spec: RuleSpec,
    ) -> Result<Forward, StoreError> {
        let _admission = self.admit();
        let node = self
            .forwards
            .get(&id)
            .map(|f| f.node_id)
            .ok_or(StoreError::NotFound(Resource::Forward(id)))?;
        self.claim_forward_port(node, spec.listen_port, Some(id))?;
        self.modify_forward(id, |f| f.spec = spec)
    }

    async fn forward_delete(&self, id: ForwardId) -> Result<(), StoreError> {
        self.forwards
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(Resource::Forward(id)))
    }

    async fn forward_set_status(
        &self,
        id: ForwardId,
        status: RuleStatus,
    ) -> Result<(), StoreError> {
        self.modify_forward(id, |f| f.status = status).map(|_| ())
    }

    async fn forward_set_remote(&self, id: ForwardId, refs: RemoteRefs) -> Result<(), StoreError> {
        self.modify_forward(id, |f| {
            apply_refs(refs, &mut f.service_id, None, &mut f.observer_id)
        })
        .map(|_| ())
    }

    async fn forward_set_traffic(
        &self,
        id: ForwardId,
        traffic: Traffic,
    ) -> Result<(), StoreError> {
        self.modify_forward(id, |f| f.traffic = traffic).map(|_| ())
    }
}

#[async_trait]
impl TunnelStore for MemoryStore {
    async fn tunnel_insert(&self, new: NewTunnel, relay_port: u16) -> Result<Tunnel, StoreError> {
        let _admission = self.admit();
        self.claim_tunnel_port(new.entry_node_id, new.spec.listen_port, None)?;

        let id = TunnelId(self.next_tunnel.fetch_add(1, Ordering::Relaxed));
        let now = current_time_millis();
        let tunnel = Tunnel {
            id,
            entry_node_id: new.entry_node_id,
            exit_node_id: new.exit_node_id,
            relay_port,
            spec: new.spec,
            status: RuleStatus::Stopped,
            service_id: None,
            chain_id: None,
            observer_id: None,
            traffic: Traffic::default(),
            created_at: now,
            updated_at: now,
        };
        self.tunnels.insert(id, tunnel.clone());
        Ok(tunnel)
    }

    async fn tunnel_get(&self, id: TunnelId) -> Result<Tunnel, StoreError> {
        self.tunnels
            .get(&id)
            .map(|t| t.clone())
            .ok_or(StoreError::NotFound(Resource::Tunnel(id)))
    }

    async fn tunnel_list(&self, filter: &RuleFilter) -> Result<Vec<Tunnel>, StoreError> {
        let mut tunnels: Vec<Tunnel> = self
            .tunnels
            .iter()
            .filter(|t| filter.matches_tunnel(t))
            .map(|t| t.clone())
            .collect();
        tunnels.sort_by_key(|t| t.id);
        Ok(tunnels)
    }

    async fn tunnel_list_by_entry(&self, node: NodeId) -> Result<Vec<Tunnel>, StoreError> {
        let mut tunnels: Vec<Tunnel> = self
            .tunnels
            .iter()
            .filter(|t| t.entry_node_id == node)
            .map(|t| t.clone())
            .collect();
        tunnels.sort_by_key(|t| t.id);
        Ok(tunnels)
    }

    async fn tunnel_replace(
        &self,
        id: TunnelId,
        update: NewTunnel,
        relay_port: u16,
    ) -> Result<Tunnel, StoreError> {
        let _admission = self.admit();
        self.claim_tunnel_port(update.entry_node_id, update.spec.listen_port, Some(id))?;
        self.modify_tunnel(id, |t| {
            t.entry_node_id = update.entry_node_id;
            t.exit_node_id = update.exit_node_id;
            t.spec = update.spec;
            t.relay_port = relay_port;
        })
    }

    async fn tunnel_delete(&self, id: TunnelId) -> Result<(), StoreError> {
        self.tunnels
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(Resource::Tunnel(id)))
    }

    async fn tunnel_set_status(&self, id: TunnelId, status: RuleStatus) -> Result<(), StoreError> {
        self.modify_tunnel(id, |t| t.status = status).map(|_| ())
    }

    async fn tunnel_set_remote(&self, id: TunnelId, refs: RemoteRefs) -> Result<(), StoreError> {
        self.modify_tunnel(id, |t| {
            apply_refs(refs, &mut t.service_id, Some(&mut t.chain_id), &mut t.observer_id)
        })
        .map(|_| ())
    }

    async fn tunnel_set_traffic(&self, id: TunnelId, traffic: Traffic) -> Result<(), StoreError> {
        self.modify_tunnel(id, |t| t.traffic = traffic).map(|_| ())
    }
}
