//! Telemetry ingestion tests

use std::sync::Arc;

use serde_json::json;

use rp_core::error::{Resource, StoreError};
use rp_core::model::{NewForward, NewTunnel, Traffic};
use rp_core::traits::{ForwardStore, TunnelStore};
use rp_core::types::{ForwardId, NodeId, TunnelId};
use rp_panel::store::MemoryStore;
use rp_panel::telemetry::{IngestSummary, TelemetryIngest};
use rp_protocol::{ObserverEvent, ObserverReport, ObserverStats};
use rp_test_utils::fixtures::{node, rule_spec};

async fn store_with_forwards(count: u16) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_node(node(1));
    store.insert_node(node(2));
    for i in 0..count {
        store
            .forward_insert(NewForward {
                node_id: NodeId(1),
                spec: rule_spec(10000 + i),
            })
            .await
            .unwrap();
    }
    store
}

fn stats(input: u64, output: u64, conns: u64) -> ObserverStats {
    ObserverStats {
        input_bytes: input,
        output_bytes: output,
        total_conns: conns,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_stats_overwrite_forward_traffic() {
    let store = store_with_forwards(42).await;
    let ingest = TelemetryIngest::new(store.clone());

    let report = ObserverReport::from_events([ObserverEvent::stats("forward-42", stats(100, 50, 3))]);
    let summary = ingest.ingest(&report).await.unwrap();
    assert_eq!(
        summary,
        IngestSummary {
            applied: 1,
            skipped: 0
        }
    );

    let forward = store.forward_get(ForwardId(42)).await.unwrap();
    assert_eq!(
        forward.traffic,
        Traffic {
            input_bytes: 100,
            output_bytes: 50,
            total_bytes: 150,
            total_requests: 3,
        }
    );
}

#[tokio::test]
async fn test_lower_report_overwrites() {
    let store = store_with_forwards(1).await;
    let ingest = TelemetryIngest::new(store.clone());

    ingest
        .ingest(&ObserverReport::from_events([ObserverEvent::stats(
            "forward-1",
            stats(100, 50, 3),
        )]))
        .await
        .unwrap();
    ingest
        .ingest(&ObserverReport::from_events([ObserverEvent::stats(
            "forward-1",
            stats(7, 1, 1),
        )]))
        .await
        .unwrap();

    let forward = store.forward_get(ForwardId(1)).await.unwrap();
    assert_eq!(forward.traffic, Traffic::absolute(7, 1, 1));
}

#[tokio::test]
async fn test_tunnel_stats() {
    let store = store_with_forwards(0).await;
    store
        .tunnel_insert(
            NewTunnel {
                entry_node_id: NodeId(1),
                exit_node_id: NodeId(2),
                spec: rule_spec(9000),
            },
            8443,
        )
        .await
        .unwrap();
    let ingest = TelemetryIngest::new(store.clone());

    ingest
        .ingest(&ObserverReport::from_events([ObserverEvent::stats(
            "tunnel-1",
            stats(5, 6, 2),
        )]))
        .await
        .unwrap();

    let tunnel = store.tunnel_get(TunnelId(1)).await.unwrap();
    assert_eq!(tunnel.traffic.total_bytes, 11);
    assert_eq!(tunnel.traffic.total_requests, 2);
}

#[tokio::test]
async fn test_malformed_event_does_not_block_batch() {
    let store = store_with_forwards(2).await;
    let ingest = TelemetryIngest::new(store.clone());

    let report: ObserverReport = serde_json::from_value(json!({
        "events": [
            {"type": "stats", "service": "forward-1", "stats": {"inputBytes": "many"}},
            {"type": "stats", "service": "forward-2", "stats": {"inputBytes": 9, "outputBytes": 1, "totalConns": 1}}
        ]
    }))
    .unwrap();

    let summary = ingest.ingest(&report).await.unwrap();
    assert_eq!(summary.applied, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        store.forward_get(ForwardId(2)).await.unwrap().traffic.total_bytes,
        10
    );
    assert_eq!(
        store.forward_get(ForwardId(1)).await.unwrap().traffic,
        Traffic::default()
    );
}

#[tokio::test]
async fn test_unusable_events_are_skipped() {
    let store = store_with_forwards(1).await;
    let ingest = TelemetryIngest::new(store.clone());

    let report: ObserverReport = serde_json::from_value(json!({
        "events": [
            {"type": "status", "service": "forward-1"},
            {"type": "stats", "service": "web-frontend", "stats": {"inputBytes": 1}},
            {"type": "stats", "service": "forward-abc", "stats": {"inputBytes": 1}},
            {"type": "stats", "service": "forward-99", "stats": {"inputBytes": 1}},
            {"type": "stats", "service": "forward-1"}
        ]
    }))
    .unwrap();

    let summary = ingest.ingest(&report).await.unwrap();
    assert_eq!(
        summary,
        IngestSummary {
            applied: 0,
            skipped: 5
        }
    );
}

#[tokio::test]
async fn test_deleted_rule_is_skipped() {
    let store = store_with_forwards(1).await;
    store.forward_delete(ForwardId(1)).await.unwrap();
    let ingest = TelemetryIngest::new(store.clone());

    let summary = ingest
        .ingest(&ObserverReport::from_events([ObserverEvent::stats(
            "forward-1",
            stats(1, 1, 1),
        )]))
        .await
        .unwrap();
    assert_eq!(summary.skipped, 1);

    assert!(matches!(
        store.forward_get(ForwardId(1)).await,
        Err(StoreError::NotFound(Resource::Forward(ForwardId(1))))
    ));
}
