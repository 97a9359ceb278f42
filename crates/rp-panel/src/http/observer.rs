//! Observer webhook

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, Json};

use rp_protocol::{ObserverReply, ObserverReport};

use crate::state::PanelState;

/// `POST /api/v1/observer/report`
///
/// Nodes retry deliveries that are not acknowledged with `ok: true`, so a
/// body that can never be decoded is still answered with a plain 400.
pub async fn report(
    State(state): State<Arc<PanelState>>,
    body: Bytes,
) -> (StatusCode, Json<ObserverReply>) {
    let report: ObserverReport = match serde_json::from_slice(&body) {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!("Rejecting undecodable observer report: {}", err);
            return (StatusCode::BAD_REQUEST, Json(ObserverReply { ok: false }));
        }
    };

    match state.telemetry.ingest(&report).await {
        Ok(summary) => {
            tracing::debug!(
                "Observer report: {} applied, {} skipped",
                summary.applied,
                summary.skipped
            );
            (StatusCode::OK, Json(ObserverReply { ok: true }))
        }
        Err(err) => {
            tracing::error!("Observer report aborted: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ObserverReply { ok: false }),
            )
        }
    }
}
