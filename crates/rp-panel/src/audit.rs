//! Audit sink writing to the `audit` tracing target

use async_trait::async_trait;

use rp_core::traits::{AuditRecord, AuditSink};

/// Emits each audit record as a structured tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAudit;

#[async_trait]
impl AuditSink for TracingAudit {
    async fn record(&self, entry: AuditRecord) {
        tracing::info!(
            target: "audit",
            action = %entry.action,
            resource = %entry.resource,
            resource_id = entry.resource_id,
            success = entry.success,
            at = entry.at,
            "{}",
            entry.detail
        );
    }
}
