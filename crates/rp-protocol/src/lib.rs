//! rp-protocol: Wire types for the proxy daemon management API
//!
//! This crate defines the JSON documents exchanged between the panel and the
//! proxy daemons it manages: service, chain and observer declarations sent
//! to a node's management API, the live configuration snapshot a node
//! returns, and the stats events a node's observer pushes back to the panel.

pub mod chain;
pub mod config;
pub mod observer;
pub mod response;
pub mod service;

pub use chain::{ChainConfig, ConnectorConfig, DialerConfig, HopConfig, HopNodeConfig};
pub use config::{ChainSummary, DaemonConfig, ServiceSummary};
pub use observer::{
    ObserverConfig, ObserverEvent, ObserverReply, ObserverReport, ObserverStats, PluginConfig,
    STATS_EVENT,
};
pub use response::{ApiStatus, ERR_DUPLICATE, ERR_NOT_FOUND};
pub use service::{
    ForwardTarget, ForwarderConfig, HandlerConfig, ListenerConfig, SelectorConfig, ServiceConfig,
    ServiceState, ServiceStatus,
};
