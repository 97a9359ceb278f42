//! Shared wiring for rp-panel integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use rp_core::model::Node;
use rp_core::traits::{AuditAction, AuditRecord, AuditSink};
use rp_panel::store::MemoryStore;
use rp_panel::Orchestrator;
use rp_test_utils::FakeConnector;

pub const OBSERVER_URL: &str = "http://panel.example:8080/api/v1/observer/report";

/// Audit sink that keeps every record
#[derive(Default)]
pub struct RecordingAudit {
    records: Mutex<Vec<AuditRecord>>,
}

impl RecordingAudit {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<(AuditAction, bool)> {
        self.records()
            .into_iter()
            .map(|r| (r.action, r.success))
            .collect()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, entry: AuditRecord) {
        self.records.lock().unwrap().push(entry);
    }
}

/// Orchestrator over an in-memory store and fake nodes
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub connector: Arc<FakeConnector>,
    pub audit: Arc<RecordingAudit>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new(nodes: Vec<Node>, observer_url: Option<&str>) -> Self {
        let store = Arc::new(MemoryStore::new());
        for node in nodes {
            store.insert_node(node);
        }
        let connector = Arc::new(FakeConnector::new());
        let audit = Arc::new(RecordingAudit::default());
        let orchestrator = Orchestrator::new(
            store.clone(),
            connector.clone(),
            audit.clone(),
            observer_url.map(str::to_string),
        );

        Self {
            store,
            connector,
            audit,
            orchestrator,
        }
    }
}
