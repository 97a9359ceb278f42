//! Remote control traits

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::RemoteError;
use crate::model::Node;
use rp_protocol::{ChainConfig, DaemonConfig, ObserverConfig, ServiceConfig};

/// Management API of one proxy daemon
///
/// Each call is independent; implementations hold no per-rule state and
/// never retry.
#[async_trait]
pub trait RemoteControl: Send + Sync {
    /// Create a forwarding service
    async fn create_service(&self, service: &ServiceConfig) -> Result<(), RemoteError>;

    /// Delete a service by name
    async fn delete_service(&self, name: &str) -> Result<(), RemoteError>;

    /// Create a relay chain
    async fn create_chain(&self, chain: &ChainConfig) -> Result<(), RemoteError>;

    /// Delete a chain by name
    async fn delete_chain(&self, name: &str) -> Result<(), RemoteError>;

    /// Create a telemetry observer
    async fn create_observer(&self, observer: &ObserverConfig) -> Result<(), RemoteError>;

    /// Fetch the live configuration
    async fn get_config(&self) -> Result<DaemonConfig, RemoteError>;

    /// Persist the live configuration on the node
    async fn save_config(&self) -> Result<(), RemoteError>;
}

/// Produces a [`RemoteControl`] bound to a node's endpoint and credentials
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, node: &Node) -> Result<Arc<dyn RemoteControl>, RemoteError>;
}
