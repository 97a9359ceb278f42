//! Core error types for Relay Panel

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{ForwardId, NodeId, NodeStatus, TunnelId};

/// Failure reason surfaced by rule operations
///
/// Each variant is one category of the error taxonomy so the HTTP layer can
/// pick a status code without inspecting messages.
#[derive(Error, Debug)]
pub enum PanelError {
    /// A referenced record does not exist
    #[error("{0} not found")]
    NotFound(Resource),

    /// Request conflicts with current state
    #[error("Conflict: {0}")]
    Conflict(#[from] Conflict),

    /// Node is not online; nothing was sent to it
    #[error("Node {node} is {status}")]
    NodeUnavailable { node: NodeId, status: NodeStatus },

    /// Node record cannot be used as a tunnel exit
    #[error("Exit node {node} misconfigured: {reason}")]
    Misconfigured { node: NodeId, reason: String },

    /// A remote create step failed
    #[error("Remote operation failed: {0}")]
    RemoteFailed(RemoteStep),

    /// Input failed validation
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// Persistence backend failed
    #[error("Store error: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for PanelError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(resource) => PanelError::NotFound(resource),
            StoreError::PortTaken { node, port } => Conflict::PortInUse { node, port }.into(),
            other => PanelError::Store(other),
        }
    }
}

/// Kind of record a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Node(NodeId),
    EntryNode(NodeId),
    ExitNode(NodeId),
    Forward(ForwardId),
    Tunnel(TunnelId),
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Node(id) => write!(f, "Node {}", id),
            Resource::EntryNode(id) => write!(f, "Entry node {}", id),
            Resource::ExitNode(id) => write!(f, "Exit node {}", id),
            Resource::Forward(id) => write!(f, "Forward {}", id),
            Resource::Tunnel(id) => write!(f, "Tunnel {}", id),
        }
    }
}

/// State conflicts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Listen port already taken within the node's scope
    #[error("port {port} already in use on node {node}")]
    PortInUse { node: NodeId, port: u16 },

    /// Tunnel entry and exit are the same node
    #[error("entry and exit node must differ")]
    SameEntryExit,

    /// Rule must be stopped before it can be modified
    #[error("rule is running, stop it first")]
    RuleRunning,
}

/// Remote step of a start workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStep {
    CreateObserver,
    CreateChain,
    CreateService,
    Connect,
}

impl std::fmt::Display for RemoteStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteStep::CreateObserver => write!(f, "observer creation failed"),
            RemoteStep::CreateChain => write!(f, "chain creation failed"),
            RemoteStep::CreateService => write!(f, "service creation failed"),
            RemoteStep::Connect => write!(f, "node client unavailable"),
        }
    }
}

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Record not found
    #[error("{0} not found")]
    NotFound(Resource),

    /// Listen port already held by another rule of the same kind on `node`
    #[error("port {port} already taken on node {node}")]
    PortTaken { node: NodeId, port: u16 },

    /// Backend failure
    #[error("Backend failure: {0}")]
    Backend(String),
}

/// Errors from a node's management API
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Request did not complete within the client timeout
    #[error("Request to {0} timed out")]
    Timeout(String),

    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Object with that name already exists on the node
    #[error("Object already exists: {0}")]
    Duplicate(String),

    /// Object does not exist on the node
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Node answered with an error status
    #[error("Node rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Node API URL is unusable
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl RemoteError {
    /// Whether the node could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, RemoteError::Timeout(_) | RemoteError::Transport(_))
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
