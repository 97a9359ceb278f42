//! Core trait definitions

mod audit;
mod remote;
mod store;

pub use audit::{AuditAction, AuditRecord, AuditSink, ResourceKind};
pub use remote::{RemoteConnector, RemoteControl};
pub use store::{ForwardStore, NodeStore, RemoteRefs, RuleStore, TunnelStore};
