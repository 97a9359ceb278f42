//! Scriptable in-process node
//!
//! [`FakeNode`] applies creates and deletes to its own live configuration
//! like a real daemon would, records every call, and can be told to fail
//! specific operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use rp_core::error::RemoteError;
use rp_core::model::Node;
use rp_core::traits::{RemoteConnector, RemoteControl};
use rp_core::types::NodeId;
use rp_protocol::{
    ChainConfig, ChainSummary, DaemonConfig, ObserverConfig, ServiceConfig, ServiceState,
    ServiceStatus, ServiceSummary,
};

/// Remote operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreateService,
    DeleteService,
    CreateChain,
    DeleteChain,
    CreateObserver,
    GetConfig,
    SaveConfig,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateService(String),
    DeleteService(String),
    CreateChain(String),
    DeleteChain(String),
    CreateObserver(String),
    GetConfig,
    SaveConfig,
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::CreateService(_) => Op::CreateService,
            Call::DeleteService(_) => Op::DeleteService,
            Call::CreateChain(_) => Op::CreateChain,
            Call::DeleteChain(_) => Op::DeleteChain,
            Call::CreateObserver(_) => Op::CreateObserver,
            Call::GetConfig => Op::GetConfig,
            Call::SaveConfig => Op::SaveConfig,
        }
    }
}

/// Scripted failure for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Duplicate,
    NotFound,
    Rejected,
    Timeout,
    Transport,
    Decode,
}

impl Failure {
    fn to_error(self, object: &str) -> RemoteError {
        match self {
            Failure::Duplicate => RemoteError::Duplicate(object.to_string()),
            Failure::NotFound => RemoteError::NotFound(object.to_string()),
            Failure::Rejected => RemoteError::Rejected {
                status: 500,
                message: "scripted failure".to_string(),
            },
            Failure::Timeout => RemoteError::Timeout("fake".to_string()),
            Failure::Transport => RemoteError::Transport("connection refused".to_string()),
            Failure::Decode => RemoteError::Decode("unexpected EOF".to_string()),
        }
    }
}

#[derive(Default)]
struct Inner {
    services: Vec<ServiceConfig>,
    chains: Vec<ChainConfig>,
    observers: Vec<ObserverConfig>,
    states: HashMap<String, ServiceState>,
    calls: Vec<Call>,
    failures: HashMap<Op, Failure>,
}

/// In-process stand-in for a proxy daemon
#[derive(Default)]
pub struct FakeNode {
    inner: Mutex<Inner>,
}

impl FakeNode {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every future `op` fail with `failure`
    pub fn fail(&self, op: Op, failure: Failure) {
        self.lock().failures.insert(op, failure);
    }

    /// Stop failing `op`
    pub fn heal(&self, op: Op) {
        self.lock().failures.remove(&op);
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls other than config fetches and saves
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c.op(), Op::GetConfig | Op::SaveConfig))
            .collect()
    }

    pub fn count(&self, op: Op) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Service declaration as received, if present
    pub fn service(&self, name: &str) -> Option<ServiceConfig> {
        self.lock().services.iter().find(|s| s.name == name).cloned()
    }

    pub fn has_chain(&self, name: &str) -> bool {
        self.lock().chains.iter().any(|c| c.name == name)
    }

    /// Chain declaration as received, if present
    pub fn chain(&self, name: &str) -> Option<ChainConfig> {
        self.lock().chains.iter().find(|c| c.name == name).cloned()
    }

    pub fn has_observer(&self, name: &str) -> bool {
        self.lock().observers.iter().any(|o| o.name == name)
    }

    /// Place a service on the node directly, as if created out of band
    pub fn put_service(&self, name: &str, state: ServiceState) {
        let mut inner = self.lock();
        if !inner.services.iter().any(|s| s.name == name) {
            inner.services.push(ServiceConfig {
                name: name.to_string(),
                ..Default::default()
            });
        }
        inner.states.insert(name.to_string(), state);
    }

    /// Place a chain on the node directly
    pub fn put_chain(&self, name: &str) {
        let mut inner = self.lock();
        if !inner.chains.iter().any(|c| c.name == name) {
            inner.chains.push(ChainConfig {
                name: name.to_string(),
                hops: Vec::new(),
            });
        }
    }

    /// Remove a service without going through the API, as if it crashed
    pub fn drop_service(&self, name: &str) {
        let mut inner = self.lock();
        inner.services.retain(|s| s.name != name);
        inner.states.remove(name);
    }

    /// Remove a chain without going through the API
    pub fn drop_chain(&self, name: &str) {
        self.lock().chains.retain(|c| c.name != name);
    }

    fn begin(&self, call: Call, object: &str) -> Result<MutexGuard<'_, Inner>, RemoteError> {
        let mut inner = self.lock();
        let op = call.op();
        inner.calls.push(call);
        match inner.failures.get(&op) {
            Some(failure) => Err(failure.to_error(object)),
            None => Ok(inner),
        }
    }
}

#[async_trait]
impl RemoteControl for FakeNode {
    async fn create_service(&self, service: &ServiceConfig) -> Result<(), RemoteError> {
        let mut inner = self.begin(Call::CreateService(service.name.clone()), &service.name)?;
        if inner.services.iter().any(|s| s.name == service.name) {
            return Err(RemoteError::Duplicate(service.name.clone()));
        }
        inner.services.push(service.clone());
        inner.states.insert(service.name.clone(), ServiceState::Ready);
        Ok(())
    }

    async fn delete_service(&self, name: &str) -> Result<(), RemoteError> {
        let mut inner = self.begin(Call::DeleteService(name.to_string()), name)?;
        let before = inner.services.len();
        inner.services.retain(|s| s.name != name);
        inner.states.remove(name);
        if inner.services.len() == before {
            return Err(RemoteError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn create_chain(&self, chain: &ChainConfig) -> Result<(), RemoteError> {
        let mut inner = self.begin(Call::CreateChain(chain.name.clone()), &chain.name)?;
        if inner.chains.iter().any(|c| c.name == chain.name) {
            return Err(RemoteError::Duplicate(chain.name.clone()));
        }
        inner.chains.push(chain.clone());
        Ok(())
    }

    async fn delete_chain(&self, name: &str) -> Result<(), RemoteError> {
        let mut inner = self.begin(Call::DeleteChain(name.to_string()), name)?;
        let before = inner.chains.len();
        inner.chains.retain(|c| c.name != name);
        if inner.chains.len() == before {
            return Err(RemoteError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn create_observer(&self, observer: &ObserverConfig) -> Result<(), RemoteError> {
        let mut inner = self.begin(Call::CreateObserver(observer.name.clone()), &observer.name)?;
        if inner.observers.iter().any(|o| o.name == observer.name) {
            return Err(RemoteError::Duplicate(observer.name.clone()));
        }
        inner.observers.push(observer.clone());
        Ok(())
    }

    async fn get_config(&self) -> Result<DaemonConfig, RemoteError> {
        let inner = self.begin(Call::GetConfig, "config")?;
        Ok(DaemonConfig {
            services: inner
                .services
                .iter()
                .map(|s| ServiceSummary {
                    name: s.name.clone(),
                    status: inner.states.get(&s.name).map(|state| ServiceStatus {
                        create_time: None,
                        state: state.clone(),
                    }),
                })
                .collect(),
            chains: inner
                .chains
                .iter()
                .map(|c| ChainSummary {
                    name: c.name.clone(),
                })
                .collect(),
        })
    }

    async fn save_config(&self) -> Result<(), RemoteError> {
        let _inner = self.begin(Call::SaveConfig, "config")?;
        Ok(())
    }
}

/// Hands out one [`FakeNode`] per node ID
#[derive(Default)]
pub struct FakeConnector {
    nodes: Mutex<HashMap<NodeId, Arc<FakeNode>>>,
    refused: Mutex<Vec<NodeId>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fake behind `id`, created on first use
    pub fn node(&self, id: NodeId) -> Arc<FakeNode> {
        let mut nodes = self.nodes.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(nodes.entry(id).or_default())
    }

    /// Make `connect` fail for `id` as if its endpoint were unusable
    pub fn refuse(&self, id: NodeId) {
        self.refused
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(id);
    }

    /// Total calls across all nodes
    pub fn total_calls(&self) -> usize {
        let nodes = self.nodes.lock().unwrap_or_else(|e| e.into_inner());
        nodes.values().map(|n| n.calls().len()).sum()
    }
}

impl RemoteConnector for FakeConnector {
    fn connect(&self, node: &Node) -> Result<Arc<dyn RemoteControl>, RemoteError> {
        let refused = self
            .refused
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&node.id);
        if refused {
            return Err(RemoteError::InvalidEndpoint(node.api_url.clone()));
        }
        Ok(self.node(node.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_created_service_reports_ready() {
        let node = FakeNode::new();
        let service = ServiceConfig {
            name: "forward-1".into(),
            ..Default::default()
        };
        node.create_service(&service).await.unwrap();

        let config = node.get_config().await.unwrap();
        assert_eq!(config.service_state("forward-1"), Some(ServiceState::Ready));
        assert!(matches!(
            node.create_service(&service).await,
            Err(RemoteError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_scripted_failure_is_recorded() {
        let node = FakeNode::new();
        node.fail(Op::CreateChain, Failure::Rejected);

        let chain = ChainConfig::relay("chain-tunnel-1", "10.0.0.2:8443");
        assert!(node.create_chain(&chain).await.is_err());
        assert_eq!(node.calls(), vec![Call::CreateChain("chain-tunnel-1".into())]);
        assert!(!node.has_chain("chain-tunnel-1"));

        node.heal(Op::CreateChain);
        node.create_chain(&chain).await.unwrap();
        assert!(node.has_chain("chain-tunnel-1"));
    }

    #[tokio::test]
    async fn test_connector_shares_fake_per_node() {
        let connector = FakeConnector::new();
        let node = crate::fixtures::node(1);
        connector.connect(&node).unwrap().save_config().await.unwrap();
        assert_eq!(connector.node(NodeId(1)).count(Op::SaveConfig), 1);

        connector.refuse(NodeId(1));
        assert!(connector.connect(&node).is_err());
    }
}
