//! Desired-state records
//!
//! Nodes are owned by the registry; forwards and tunnels reference them by
//! ID only. Rule records carry the names of the remote objects they created
//! (left in place after a stop so reconciliation can keep using them) and
//! the traffic counters written by telemetry ingestion.

use serde::{Deserialize, Serialize};

use crate::error::PanelError;
use crate::naming;
use crate::types::{ForwardId, NodeId, NodeStatus, Protocol, RuleStatus, Strategy, TunnelId};

/// A managed proxy daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Management API base URL, e.g. `http://203.0.113.9:18080`
    pub api_url: String,
    #[serde(default, skip_serializing)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    pub status: NodeStatus,
    /// Relay listener port when this node is a tunnel exit, 0 if none
    pub relay_port: u16,
    /// Last health probe, unix millis
    pub last_check_at: Option<u64>,
}

impl Node {
    pub fn is_online(&self) -> bool {
        self.status == NodeStatus::Online
    }

    /// Host part of the management API URL.
    ///
    /// Scheme, path and port are stripped; bracketed IPv6 literals keep their
    /// brackets so the result can be joined with a port directly.
    pub fn api_host(&self) -> Option<String> {
        let rest = self
            .api_url
            .strip_prefix("http://")
            .or_else(|| self.api_url.strip_prefix("https://"))
            .unwrap_or(&self.api_url);
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let authority = authority.rsplit('@').next().unwrap_or_default();

        let host = if authority.starts_with('[') {
            let end = authority.find(']')?;
            &authority[..=end]
        } else {
            authority.split(':').next().unwrap_or_default()
        };

        if host.is_empty() {
            None
        } else {
            Some(host.to_string())
        }
    }
}

/// Settings shared by forwards and tunnels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default)]
    pub protocol: Protocol,
    pub listen_port: u16,
    /// Ordered `host:port` targets
    pub targets: Vec<String>,
    #[serde(default)]
    pub strategy: Option<Strategy>,
    #[serde(default)]
    pub enable_tls: bool,
    #[serde(default)]
    pub remark: String,
}

impl RuleSpec {
    pub fn validate(&self) -> Result<(), PanelError> {
        if self.name.trim().is_empty() {
            return Err(PanelError::Invalid("name must not be empty".to_string()));
        }
        if self.listen_port == 0 {
            return Err(PanelError::Invalid("listen_port must be 1-65535".to_string()));
        }
        if self.targets.is_empty() {
            return Err(PanelError::Invalid("at least one target is required".to_string()));
        }
        if let Some(bad) = self.targets.iter().find(|t| t.trim().is_empty()) {
            return Err(PanelError::Invalid(format!("invalid target {:?}", bad)));
        }
        Ok(())
    }

    /// Strategy sent to the daemon
    pub fn effective_strategy(&self) -> Strategy {
        Strategy::effective(self.strategy, self.targets.len())
    }
}

/// Cumulative traffic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traffic {
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub total_bytes: u64,
    pub total_requests: u64,
}

impl Traffic {
    /// Counters as reported for a window; `total_bytes` is derived
    pub fn absolute(input_bytes: u64, output_bytes: u64, total_requests: u64) -> Self {
        Self {
            input_bytes,
            output_bytes,
            total_bytes: input_bytes.saturating_add(output_bytes),
            total_requests,
        }
    }
}

/// Create request for a forward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewForward {
    pub node_id: NodeId,
    #[serde(flatten)]
    pub spec: RuleSpec,
}

/// Single-hop forwarding rule bound to one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forward {
    pub id: ForwardId,
    pub node_id: NodeId,
    #[serde(flatten)]
    pub spec: RuleSpec,
    pub status: RuleStatus,
    pub service_id: Option<String>,
    pub observer_id: Option<String>,
    #[serde(flatten)]
    pub traffic: Traffic,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Forward {
    /// Service name to look for on the node
    pub fn expected_service(&self) -> String {
        self.service_id
            .clone()
            .unwrap_or_else(|| naming::forward_service(self.id))
    }
}

/// Create or update request for a tunnel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTunnel {
    pub entry_node_id: NodeId,
    pub exit_node_id: NodeId,
    #[serde(flatten)]
    pub spec: RuleSpec,
}

/// Two-hop rule: entry node -> exit node relay -> targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tunnel {
    pub id: TunnelId,
    pub entry_node_id: NodeId,
    pub exit_node_id: NodeId,
    /// Copied from the exit node at create/update time
    pub relay_port: u16,
    #[serde(flatten)]
    pub spec: RuleSpec,
    pub status: RuleStatus,
    pub service_id: Option<String>,
    pub chain_id: Option<String>,
    pub observer_id: Option<String>,
    #[serde(flatten)]
    pub traffic: Traffic,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Tunnel {
    /// Service name to look for on the entry node
    pub fn expected_service(&self) -> String {
        self.service_id
            .clone()
            .unwrap_or_else(|| naming::tunnel_service(self.id))
    }

    /// Chain name to look for on the entry node
    pub fn expected_chain(&self) -> String {
        self.chain_id
            .clone()
            .unwrap_or_else(|| naming::tunnel_chain(self.id))
    }
}

/// List filter for rules
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RuleFilter {
    /// For tunnels, matches either end
    pub node_id: Option<NodeId>,
    pub status: Option<RuleStatus>,
    /// Case-insensitive substring of the name
    pub keyword: Option<String>,
}

impl RuleFilter {
    pub fn matches(&self, spec: &RuleSpec, status: RuleStatus) -> bool {
        if self.status.is_some_and(|s| s != status) {
            return false;
        }
        match self.keyword.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => spec.name.to_lowercase().contains(&k.to_lowercase()),
            _ => true,
        }
    }

    pub fn matches_forward(&self, forward: &Forward) -> bool {
        self.node_id.map_or(true, |n| n == forward.node_id)
            && self.matches(&forward.spec, forward.status)
    }

    pub fn matches_tunnel(&self, tunnel: &Tunnel) -> bool {
        self.node_id
            .map_or(true, |n| n == tunnel.entry_node_id || n == tunnel.exit_node_id)
            && self.matches(&tunnel.spec, tunnel.status)
    }
}

/// Rule counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: u64,
    pub running: u64,
    pub stopped: u64,
    pub error: u64,
}

impl StatusCounts {
    pub fn tally(statuses: impl IntoIterator<Item = RuleStatus>) -> Self {
        statuses
            .into_iter()
            .fold(Self::default(), |mut counts, status| {
                counts.total += 1;
                match status {
                    RuleStatus::Running => counts.running += 1,
                    RuleStatus::Stopped => counts.stopped += 1,
                    RuleStatus::Error => counts.error += 1,
                }
                counts
            })
    }
}
