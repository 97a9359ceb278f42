//! Chain declarations
//!
//! A chain is an ordered list of hops a service dials through. Tunnels use a
//! single-hop chain pointing at the exit node's relay listener.

use serde::{Deserialize, Serialize};

/// A chain as accepted by `POST /config/chains`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub hops: Vec<HopConfig>,
}

impl ChainConfig {
    /// Single hop to a relay listener at `addr`, dialed over TCP
    pub fn relay(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hops: vec![HopConfig {
                name: "hop-0".to_string(),
                nodes: vec![HopNodeConfig {
                    name: "exit-relay".to_string(),
                    addr: addr.into(),
                    connector: ConnectorConfig {
                        kind: "relay".to_string(),
                    },
                    dialer: DialerConfig {
                        kind: "tcp".to_string(),
                    },
                }],
            }],
        }
    }
}

/// One hop of a chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HopConfig {
    pub name: String,
    pub nodes: Vec<HopNodeConfig>,
}

/// A node reachable from a hop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HopNodeConfig {
    pub name: String,
    pub addr: String,
    pub connector: ConnectorConfig,
    pub dialer: DialerConfig,
}

/// Application-level protocol spoken to the hop node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Transport used to reach the hop node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialerConfig {
    #[serde(rename = "type")]
    pub kind: String,
}
