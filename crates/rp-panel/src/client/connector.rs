//! Connector producing [`NodeClient`]s

use std::sync::Arc;
use std::time::Duration;

use rp_core::error::RemoteError;
use rp_core::model::Node;
use rp_core::traits::{RemoteConnector, RemoteControl};

use super::NodeClient;

/// Builds a [`NodeClient`] per node over one shared HTTP connection pool
#[derive(Clone)]
pub struct HttpConnector {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpConnector {
    /// Create a connector whose clients time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self { http, timeout })
    }
}

impl RemoteConnector for HttpConnector {
    fn connect(&self, node: &Node) -> Result<Arc<dyn RemoteControl>, RemoteError> {
        let client = NodeClient::new(self.http.clone(), node, self.timeout)?;
        Ok(Arc::new(client))
    }
}
