//! Live configuration snapshot returned by `GET /config`
//!
//! Only the fields the panel reconciles against are decoded; everything else
//! in the daemon's document is ignored.

use serde::{Deserialize, Serialize};

use crate::service::{ServiceState, ServiceStatus};

/// Full running configuration of a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub services: Vec<ServiceSummary>,
    #[serde(default)]
    pub chains: Vec<ChainSummary>,
}

impl DaemonConfig {
    /// Whether a chain with this name is present
    pub fn has_chain(&self, name: &str) -> bool {
        self.chains.iter().any(|c| c.name == name)
    }

    /// Run state of the named service, if the service exists
    pub fn service_state(&self, name: &str) -> Option<ServiceState> {
        self.services
            .iter()
            .find(|s| s.name == name)
            .map(ServiceSummary::state)
    }
}

/// A service entry in the live configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceStatus>,
}

impl ServiceSummary {
    /// Reported state, [`ServiceState::Stopped`] when the daemon reports none
    pub fn state(&self) -> ServiceState {
        self.status
            .as_ref()
            .map(|s| s.state.clone())
            .unwrap_or_default()
    }
}

/// A chain entry in the live configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub name: String,
}
