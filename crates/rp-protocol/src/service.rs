//! Service declarations
//!
//! A service is the daemon-side construct that listens on a port and
//! forwards accepted traffic to one or more targets, optionally through a
//! chain of hops.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Metadata key enabling per-service traffic statistics
pub const META_ENABLE_STATS: &str = "enableStats";
/// Metadata key for the observer reporting period
pub const META_OBSERVER_PERIOD: &str = "observer.period";
/// Metadata key asking the daemon to reset counters after each report
pub const META_OBSERVER_RESET: &str = "observer.resetTraffic";

/// A forwarding service as accepted by `POST /config/services`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Unique service name on the node
    pub name: String,
    /// Listen address, e.g. `:8080`
    pub addr: String,
    /// Connection handler
    pub handler: HandlerConfig,
    /// Listener accepting inbound connections
    pub listener: ListenerConfig,
    /// Target selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarder: Option<ForwarderConfig>,
    /// Name of the observer receiving stats events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observer: Option<String>,
    /// Free-form service metadata
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Runtime status, only present in responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
}

impl ServiceConfig {
    /// Build a plain port-forwarding service.
    ///
    /// `transport` is the handler/listener type (`tcp` or `udp`). Targets are
    /// named `target-<index>` in declaration order.
    pub fn forward(
        name: impl Into<String>,
        port: u16,
        transport: &str,
        targets: &[String],
        strategy: &str,
    ) -> Self {
        let nodes = targets
            .iter()
            .enumerate()
            .map(|(i, addr)| ForwardTarget {
                name: format!("target-{}", i),
                addr: addr.clone(),
            })
            .collect();

        Self {
            name: name.into(),
            addr: format!(":{}", port),
            handler: HandlerConfig {
                kind: transport.to_string(),
                chain: None,
            },
            listener: ListenerConfig {
                kind: transport.to_string(),
            },
            forwarder: Some(ForwarderConfig {
                nodes,
                selector: Some(SelectorConfig {
                    strategy: strategy.to_string(),
                    max_fails: 1,
                    fail_timeout: "30s".to_string(),
                }),
            }),
            ..Default::default()
        }
    }

    /// Terminate TLS on the listener (`tls` for TCP, `dtls` for UDP)
    pub fn with_tls(mut self) -> Self {
        self.listener.kind = match self.listener.kind.as_str() {
            "udp" => "dtls".to_string(),
            _ => "tls".to_string(),
        };
        self
    }

    /// Route forwarded traffic through a named chain
    pub fn via_chain(mut self, chain: impl Into<String>) -> Self {
        self.handler.chain = Some(chain.into());
        self
    }

    /// Bind an observer and enable periodic stats with counter reset
    pub fn with_observer(mut self, observer: impl Into<String>, period: &str) -> Self {
        self.observer = Some(observer.into());
        self.metadata
            .insert(META_ENABLE_STATS.to_string(), Value::Bool(true));
        self.metadata.insert(
            META_OBSERVER_PERIOD.to_string(),
            Value::String(period.to_string()),
        );
        self.metadata
            .insert(META_OBSERVER_RESET.to_string(), Value::Bool(true));
        self
    }
}

/// Service handler section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Handler type (`tcp`, `udp`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Chain used for egress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
}

/// Service listener section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Listener type (`tcp`, `udp`, `tls`, `dtls`)
    #[serde(rename = "type")]
    pub kind: String,
}

/// Forwarder section: the ordered targets and how to pick between them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwarderConfig {
    /// Target nodes
    pub nodes: Vec<ForwardTarget>,
    /// Distribution strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<SelectorConfig>,
}

/// One forwarding target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardTarget {
    pub name: String,
    pub addr: String,
}

/// Target selector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorConfig {
    /// `round`, `rand`, `fifo` or `hash`
    pub strategy: String,
    pub max_fails: u32,
    pub fail_timeout: String,
}

/// Runtime status reported for a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    #[serde(default)]
    pub create_time: Option<i64>,
    #[serde(default)]
    pub state: ServiceState,
}

/// Run state of a service as reported by the daemon
///
/// Unrecognized states are preserved verbatim in [`ServiceState::Other`] so a
/// new daemon vocabulary shows up in logs instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceState {
    /// Listener bound and accepting
    Ready,
    /// Serving traffic
    Running,
    /// Listener failed
    Failed,
    /// Service was closed
    Closed,
    /// No state reported
    #[default]
    Stopped,
    /// Anything else
    Other(String),
}

impl ServiceState {
    pub fn as_str(&self) -> &str {
        match self {
            ServiceState::Ready => "ready",
            ServiceState::Running => "running",
            ServiceState::Failed => "failed",
            ServiceState::Closed => "closed",
            ServiceState::Stopped => "stopped",
            ServiceState::Other(s) => s,
        }
    }
}

impl From<String> for ServiceState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ready" => ServiceState::Ready,
            "running" => ServiceState::Running,
            "failed" => ServiceState::Failed,
            "closed" => ServiceState::Closed,
            "stopped" | "" => ServiceState::Stopped,
            _ => ServiceState::Other(s),
        }
    }
}

impl From<&str> for ServiceState {
    fn from(s: &str) -> Self {
        ServiceState::from(s.to_string())
    }
}

impl From<ServiceState> for String {
    fn from(state: ServiceState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
