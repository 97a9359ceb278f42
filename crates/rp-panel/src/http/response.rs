use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use rp_core::error::PanelError;

pub type HttpResponse = Response;
pub type HttpResult<T = ()> = Result<T, HttpResponse>;

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
}

pub(crate) fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> HttpResponse {
    (
        status,
        Json(ErrorEnvelope {
            code: code.into(),
            message: message.into(),
        }),
    )
        .into_response()
}

pub fn internal_error(err: impl Display) -> HttpResponse {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        err.to_string(),
    )
}

pub fn not_found(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

pub fn bad_gateway(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::BAD_GATEWAY, "REMOTE_FAILED", message)
}

/// Map an orchestration failure to its HTTP status
pub fn panel_error(err: PanelError) -> HttpResponse {
    let message = err.to_string();
    match err {
        PanelError::NotFound(_) => not_found(message),
        PanelError::Conflict(_) => json_error(StatusCode::CONFLICT, "CONFLICT", message),
        PanelError::NodeUnavailable { .. } => {
            json_error(StatusCode::CONFLICT, "NODE_UNAVAILABLE", message)
        }
        PanelError::Misconfigured { .. } => {
            json_error(StatusCode::CONFLICT, "MISCONFIGURED", message)
        }
        PanelError::Invalid(_) => json_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
        PanelError::RemoteFailed(_) => bad_gateway(message),
        PanelError::Store(err) => {
            tracing::error!("Store failure: {}", err);
            internal_error(message)
        }
    }
}
