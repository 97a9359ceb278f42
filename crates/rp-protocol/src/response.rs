//! Management API status bodies
//!
//! Every mutating call answers with `{"msg": "OK"}` on success or
//! `{"code": <n>, "msg": "..."}` alongside a non-2xx status on failure.

use serde::{Deserialize, Serialize};

/// Object with the same name already exists
pub const ERR_DUPLICATE: i64 = 40002;
/// Object does not exist
pub const ERR_NOT_FOUND: i64 = 40004;

/// Status body of a management API response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStatus {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
}

fn is_zero(code: &i64) -> bool {
    *code == 0
}

impl ApiStatus {
    /// Success body
    pub fn ok() -> Self {
        Self {
            code: 0,
            msg: "OK".to_string(),
        }
    }

    /// Error body
    pub fn error(code: i64, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
        }
    }
}
