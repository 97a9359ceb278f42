//! Panel daemon configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_secs;
use super::NodeProfile;
use crate::error::ConfigError;

/// Path telemetry is pushed to, relative to the public URL
pub const OBSERVER_REPORT_PATH: &str = "/api/v1/observer/report";

/// Configuration for the panel daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Address the HTTP API binds to
    pub bind_address: String,

    /// Externally reachable base URL of this panel.
    ///
    /// Nodes push telemetry here. Without it rules run with no observer.
    pub public_url: Option<String>,

    /// Reconciliation interval in seconds
    #[serde(with = "duration_secs")]
    pub sync_interval: Duration,

    /// Node health probe interval, seconds or `"30s"` style
    #[serde(with = "duration_secs")]
    pub health_interval: Duration,

    /// Timeout applied to every management API call, in seconds
    #[serde(with = "duration_secs")]
    pub remote_timeout: Duration,

    /// Managed nodes; IDs are assigned in file order starting at 1
    pub nodes: Vec<NodeProfile>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            public_url: None,
            sync_interval: Duration::from_secs(5),
            health_interval: Duration::from_secs(30),
            remote_timeout: Duration::from_secs(5),
            nodes: Vec::new(),
        }
    }
}

impl PanelConfig {
    /// URL nodes should deliver observer reports to, if a public URL is set
    pub fn observer_url(&self) -> Option<String> {
        self.public_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .map(|url| format!("{}{}", url, OBSERVER_REPORT_PATH))
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("sync_interval", self.sync_interval),
            ("health_interval", self.health_interval),
            ("remote_timeout", self.remote_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("{} must be at least 1s", field)));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if node.name.trim().is_empty() {
                return Err(ConfigError::Invalid("node name must not be empty".to_string()));
            }
            if node.api_url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "node {} has no api_url",
                    node.name
                )));
            }
            if !seen.insert(node.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate node name {}",
                    node.name
                )));
            }
        }
        Ok(())
    }
}
