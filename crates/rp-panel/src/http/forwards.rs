//! Forward endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use rp_core::model::{Forward, NewForward, RuleFilter, RuleSpec, StatusCounts};
use rp_core::types::ForwardId;

use super::response::{panel_error, HttpResult};
use crate::state::PanelState;

pub async fn list_forwards(
    State(state): State<Arc<PanelState>>,
    Query(filter): Query<RuleFilter>,
) -> HttpResult<Json<Vec<Forward>>> {
    state
        .orchestrator
        .list_forwards(&filter)
        .await
        .map(Json)
        .map_err(panel_error)
}

pub async fn create_forward(
    State(state): State<Arc<PanelState>>,
    Json(new): Json<NewForward>,
) -> HttpResult<(StatusCode, Json<Forward>)> {
    state
        .orchestrator
        .create_forward(new)
        .await
        .map(|forward| (StatusCode::CREATED, Json(forward)))
        .map_err(panel_error)
}

pub async fn get_forward(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<ForwardId>,
) -> HttpResult<Json<Forward>> {
    state
        .orchestrator
        .get_forward(id)
        .await
        .map(Json)
        .map_err(panel_error)
}

pub async fn update_forward(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<ForwardId>,
    Json(spec): Json<RuleSpec>,
) -> HttpResult<Json<Forward>> {
    state
        .orchestrator
        .update_forward(id, spec)
        .await
        .map(Json)
        .map_err(panel_error)
}

pub async fn delete_forward(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<ForwardId>,
) -> HttpResult<StatusCode> {
    state
        .orchestrator
        .delete_forward(id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(panel_error)
}

pub async fn start_forward(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<ForwardId>,
) -> HttpResult<Json<Forward>> {
    state
        .orchestrator
        .start_forward(id)
        .await
        .map(Json)
        .map_err(panel_error)
}

pub async fn stop_forward(
    State(state): State<Arc<PanelState>>,
    Path(id): Path<ForwardId>,
) -> HttpResult<Json<Forward>> {
    state
        .orchestrator
        .stop_forward(id)
        .await
        .map(Json)
        .map_err(panel_error)
}

pub async fn forward_stats(
    State(state): State<Arc<PanelState>>,
) -> HttpResult<Json<StatusCounts>> {
    state
        .orchestrator
        .forward_stats()
        .await
        .map(Json)
        .map_err(panel_error)
}
