//! Audit trail

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// Operation being audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Start,
    Stop,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Start => "start",
            AuditAction::Stop => "stop",
        };
        f.write_str(s)
    }
}

/// Kind of record the action applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Forward,
    Tunnel,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Forward => f.write_str("forward"),
            ResourceKind::Tunnel => f.write_str("tunnel"),
        }
    }
}

/// One audit entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub action: AuditAction,
    pub resource: ResourceKind,
    pub resource_id: u64,
    /// Human-readable summary, usually the rule name
    pub detail: String,
    pub success: bool,
    /// Unix millis
    pub at: u64,
}

impl AuditRecord {
    pub fn new(
        action: AuditAction,
        resource: ResourceKind,
        resource_id: u64,
        detail: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            action,
            resource,
            resource_id,
            detail: detail.into(),
            success,
            at: crate::time::current_time_millis(),
        }
    }
}

/// Append-only audit log
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditRecord);
}
