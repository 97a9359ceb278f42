//! Node profile configuration

use serde::{Deserialize, Serialize};

/// A node entry in the panel configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeProfile {
    /// Display name, also used in observer names
    pub name: String,

    /// Management API base URL
    pub api_url: String,

    /// Basic auth user; empty disables auth
    #[serde(default)]
    pub username: String,

    /// Basic auth password
    #[serde(default)]
    pub password: String,

    /// Relay listener port when used as a tunnel exit
    #[serde(default)]
    pub relay_port: u16,
}

impl NodeProfile {
    /// Create a profile without credentials or relay port
    pub fn new(name: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_url: api_url.into(),
            ..Default::default()
        }
    }
}
