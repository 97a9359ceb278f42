//! Dashboard summary

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use rp_core::model::StatusCounts;
use rp_core::types::NodeStatus;

use super::response::{panel_error, HttpResult};
use crate::state::PanelState;

/// Node counts by health
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCounts {
    pub total: u64,
    pub online: u64,
    pub offline: u64,
    pub error: u64,
}

impl NodeCounts {
    fn tally(statuses: impl IntoIterator<Item = NodeStatus>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            counts.total += 1;
            match status {
                NodeStatus::Online => counts.online += 1,
                NodeStatus::Offline => counts.offline += 1,
                NodeStatus::Error => counts.error += 1,
            }
        }
        counts
    }
}

/// Response of `GET /api/v1/stats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub nodes: NodeCounts,
    pub forwards: StatusCounts,
    pub tunnels: StatusCounts,
    pub version: String,
}

pub async fn dashboard(State(state): State<Arc<PanelState>>) -> HttpResult<Json<DashboardStats>> {
    let nodes = state
        .store
        .node_list()
        .await
        .map_err(|e| panel_error(e.into()))?;
    let forwards = state.orchestrator.forward_stats().await.map_err(panel_error)?;
    let tunnels = state.orchestrator.tunnel_stats().await.map_err(panel_error)?;

    Ok(Json(DashboardStats {
        nodes: NodeCounts::tally(nodes.iter().map(|n| n.status)),
        forwards,
        tunnels,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
