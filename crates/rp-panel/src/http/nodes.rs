//! Node views

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use rp_core::error::PanelError;
use rp_core::model::Node;
use rp_core::types::NodeId;
use rp_protocol::DaemonConfig;

use super::response::{bad_gateway, panel_error, HttpResult};
use crate::state::PanelState;

pub async fn list_nodes(State(state): State<Arc<PanelState>>) -> HttpResult<Json<Vec<Node>>> {
    state
        .store
        .node_list()
        .await
        .map(Json)
        .map_err(|e| panel_error(e.into()))
}

pub async fn get_node(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<NodeId>,
) -> HttpResult<Json<Node>> {
    state
        .store
        .node_get(id)
        .await
        .map(Json)
        .map_err(|e| panel_error(e.into()))
}

/// Live configuration fetched from the node
pub async fn node_config(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<NodeId>,
) -> HttpResult<Json<DaemonConfig>> {
    let node = state
        .store
        .node_get(id)
        .await
        .map_err(|e| panel_error(PanelError::from(e)))?;

    let client = state
        .connector
        .connect(&node)
        .map_err(|e| bad_gateway(e.to_string()))?;

    client.get_config().await.map(Json).map_err(|e| {
        tracing::warn!("Config fetch from {} failed: {}", node.name, e);
        bad_gateway(e.to_string())
    })
}
