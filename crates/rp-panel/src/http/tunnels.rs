//! Tunnel endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use rp_core::model::{NewTunnel, RuleFilter, StatusCounts, Tunnel};
use rp_core::types::TunnelId;

use super::response::{panel_error, HttpResult};
use crate::state::PanelState;

pub async fn list_tunnels(
    State(state): State<Arc<PanelState>>,
    Query(filter): Query<RuleFilter>,
) -> HttpResult<Json<Vec<Tunnel>>> {
    state
        .orchestrator
        .list_tunnels(&filter)
        .await
        .map(Json)
        .map_err(panel_error)
}

pub async fn create_tunnel(
    State(state): State<Arc<PanelState>>,
    Json(new): Json<NewTunnel>,
) -> HttpResult<(StatusCode, Json<Tunnel>)> {
    state
        .orchestrator
        .create_tunnel(new)
        .await
        .map(|tunnel| (StatusCode::CREATED, Json(tunnel)))
        .map_err(panel_error)
}

pub async fn get_tunnel(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<TunnelId>,
) -> HttpResult<Json<Tunnel>> {
    state
        .orchestrator
        .get_tunnel(id)
        .await
        .map(Json)
        .map_err(panel_error)
}

pub async fn update_tunnel(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<TunnelId>,
    Json(update): Json<NewTunnel>,
) -> HttpResult<Json<Tunnel>> {
    state
        .orchestrator
        .update_tunnel(id, update)
        .await
        .map(Json)
        .map_err(panel_error)
}

pub async fn delete_tunnel(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<TunnelId>,
) -> HttpResult<StatusCode> {
    state
        .orchestrator
        .delete_tunnel(id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(panel_error)
}

pub async fn start_tunnel(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<TunnelId>,
) -> HttpResult<Json<Tunnel>> {
    state
        .orchestrator
        .start_tunnel(id)
        .await
        .map(Json)
        .map_err(panel_error)
}

pub async fn stop_tunnel(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<TunnelId>,
) -> HttpResult<Json<Tunnel>> {
    state
        .orchestrator
        .stop_tunnel(id)
        .await
        .map(Json)
        .map_err(panel_error)
}

pub async fn tunnel_stats(
    State(state): State<Arc<PanelState>>,
) -> HttpResult<Json<StatusCounts>> {
    state
        .orchestrator
        .tunnel_stats()
        .await
        .map(Json)
        .map_err(panel_error)
}
