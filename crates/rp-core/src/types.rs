//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Get the raw numeric ID
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

record_id!(
    /// Unique identifier for a managed node
    NodeId
);
record_id!(
    /// Unique identifier for a forward rule
    ForwardId
);
record_id!(
    /// Unique identifier for a tunnel rule
    TunnelId
);

/// Last-known health of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Management API reachable
    Online,
    /// Management API unreachable
    #[default]
    Offline,
    /// Reachable but answering with errors
    Error,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Online => write!(f, "online"),
            NodeStatus::Offline => write!(f, "offline"),
            NodeStatus::Error => write!(f, "error"),
        }
    }
}

/// Panel-side status of a forward or tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    #[default]
    Stopped,
    Running,
    Error,
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleStatus::Stopped => write!(f, "stopped"),
            RuleStatus::Running => write!(f, "running"),
            RuleStatus::Error => write!(f, "error"),
        }
    }
}

/// Transport protocol of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    /// Handler/listener type on the daemon
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target distribution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Round robin
    #[default]
    Round,
    /// Uniform random
    #[serde(alias = "rand")]
    Random,
    /// First available, in order
    Fifo,
    /// Hash of the client address
    Hash,
}

impl Strategy {
    /// Selector strategy name understood by the daemon
    pub fn selector_name(self) -> &'static str {
        match self {
            Strategy::Round => "round",
            Strategy::Random => "rand",
            Strategy::Fifo => "fifo",
            Strategy::Hash => "hash",
        }
    }

    /// Strategy actually sent for a target list.
    ///
    /// Unset, or a single target, always resolves to round robin.
    pub fn effective(strategy: Option<Strategy>, target_count: usize) -> Strategy {
        match strategy {
            Some(s) if target_count > 1 => s,
            _ => Strategy::Round,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Round => write!(f, "round"),
            Strategy::Random => write!(f, "random"),
            Strategy::Fifo => write!(f, "fifo"),
            Strategy::Hash => write!(f, "hash"),
        }
    }
}
