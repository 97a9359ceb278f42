//! JSON HTTP surface

pub mod forwards;
pub mod nodes;
pub mod observer;
pub mod response;
pub mod stats;
pub mod tunnels;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::PanelState;

pub fn build_router(state: Arc<PanelState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/stats", get(stats::dashboard))
        .route("/api/v1/nodes", get(nodes::list_nodes))
        .route("/api/v1/nodes/:id", get(nodes::get_node))
        .route("/api/v1/nodes/:id/config", get(nodes::node_config))
        .route(
            "/api/v1/forwards",
            get(forwards::list_forwards).post(forwards::create_forward),
        )
        .route("/api/v1/forwards/stats", get(forwards::forward_stats))
        .route(
            "/api/v1/forwards/:id",
            get(forwards::get_forward)
                .put(forwards::update_forward)
                .delete(forwards::delete_forward),
        )
        .route("/api/v1/forwards/:id/start", post(forwards::start_forward))
        .route("/api/v1/forwards/:id/stop", post(forwards::stop_forward))
        .route(
            "/api/v1/tunnels",
            get(tunnels::list_tunnels).post(tunnels::create_tunnel),
        )
        .route("/api/v1/tunnels/stats", get(tunnels::tunnel_stats))
        .route(
            "/api/v1/tunnels/:id",
            get(tunnels::get_tunnel)
                .put(tunnels::update_tunnel)
                .delete(tunnels::delete_tunnel),
        )
        .route("/api/v1/tunnels/:id/start", post(tunnels::start_tunnel))
        .route("/api/v1/tunnels/:id/stop", post(tunnels::stop_tunnel))
        .route("/api/v1/observer/report", post(observer::report))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
