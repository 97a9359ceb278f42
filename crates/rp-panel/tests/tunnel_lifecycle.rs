//! Tunnel lifecycle tests
//!
//! Node 1 is the entry, node 2 the exit. Only the entry's fake should ever
//! see calls.

mod common;

use rp_core::error::{Conflict, PanelError, RemoteStep, Resource};
use rp_core::model::{NewTunnel, Node};
use rp_core::traits::TunnelStore;
use rp_core::types::{NodeId, NodeStatus, RuleStatus, TunnelId};
use rp_test_utils::fixtures::{node, node_with_status, rule_spec};
use rp_test_utils::{Call, Failure, Op};

use common::{Harness, OBSERVER_URL};

fn new_tunnel(entry: u64, exit: u64, port: u16) -> NewTunnel {
    NewTunnel {
        entry_node_id: NodeId(entry),
        exit_node_id: NodeId(exit),
        spec: rule_spec(port),
    }
}

fn exit_without_relay(id: u64) -> Node {
    Node {
        relay_port: 0,
        ..node(id)
    }
}

#[tokio::test]
async fn test_start_tunnel_creates_chain_observer_service() {
    let h = Harness::new(vec![node(1), node(2)], Some(OBSERVER_URL));
    let tunnel = h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();
    assert_eq!(tunnel.relay_port, 8443);

    let started = h.orchestrator.start_tunnel(tunnel.id).await.unwrap();
    assert_eq!(started.status, RuleStatus::Running);
    assert_eq!(started.service_id.as_deref(), Some("tunnel-1"));
    assert_eq!(started.chain_id.as_deref(), Some("chain-tunnel-1"));
    assert_eq!(started.observer_id.as_deref(), Some("observer-node-1-1"));

    let entry = h.connector.node(NodeId(1));
    assert_eq!(
        entry.mutations(),
        vec![
            Call::CreateChain("chain-tunnel-1".into()),
            Call::CreateObserver("observer-node-1-1".into()),
            Call::CreateService("tunnel-1".into()),
        ]
    );
    let chain = entry.chain("chain-tunnel-1").unwrap();
    assert_eq!(chain.hops[0].nodes[0].addr, "10.0.0.2:8443");
    let service = entry.service("tunnel-1").unwrap();
    assert_eq!(service.handler.chain.as_deref(), Some("chain-tunnel-1"));

    assert!(h.connector.node(NodeId(2)).calls().is_empty());
}

#[tokio::test]
async fn test_start_running_tunnel_is_noop() {
    let h = Harness::new(vec![node(1), node(2)], Some(OBSERVER_URL));
    let tunnel = h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();
    h.orchestrator.start_tunnel(tunnel.id).await.unwrap();

    let entry = h.connector.node(NodeId(1));
    entry.clear_calls();

    let again = h.orchestrator.start_tunnel(tunnel.id).await.unwrap();
    assert_eq!(again.status, RuleStatus::Running);
    assert_eq!(again.chain_id.as_deref(), Some("chain-tunnel-1"));
    assert!(entry.mutations().is_empty());
    assert!(entry.calls().is_empty());
}

#[tokio::test]
async fn test_stop_stopped_tunnel_is_noop() {
    let h = Harness::new(vec![node(1), node(2)], None);
    let tunnel = h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();
    let entry = h.connector.node(NodeId(1));
    entry.clear_calls();

    let stopped = h.orchestrator.stop_tunnel(tunnel.id).await.unwrap();
    assert_eq!(stopped.status, RuleStatus::Stopped);
    assert!(entry.mutations().is_empty());

    h.store
        .tunnel_set_status(tunnel.id, RuleStatus::Error)
        .await
        .unwrap();
    let errored = h.orchestrator.stop_tunnel(tunnel.id).await.unwrap();
    assert_eq!(errored.status, RuleStatus::Error);
    assert_eq!(h.connector.total_calls(), 0);
}

#[tokio::test]
async fn test_entry_equals_exit_is_rejected() {
    let h = Harness::new(vec![node(1)], None);
    let err = h
        .orchestrator
        .create_tunnel(new_tunnel(1, 1, 9000))
        .await
        .unwrap_err();
    assert!(matches!(err, PanelError::Conflict(Conflict::SameEntryExit)));
}

#[tokio::test]
async fn test_exit_without_relay_port_is_misconfigured() {
    let h = Harness::new(vec![node(1), exit_without_relay(2)], None);
    let err = h
        .orchestrator
        .create_tunnel(new_tunnel(1, 2, 9000))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PanelError::Misconfigured {
            node: NodeId(2),
            ..
        }
    ));
}

#[tokio::test]
async fn test_missing_endpoints_are_named() {
    let h = Harness::new(vec![node(1)], None);

    let err = h
        .orchestrator
        .create_tunnel(new_tunnel(7, 1, 9000))
        .await
        .unwrap_err();
    assert!(matches!(err, PanelError::NotFound(Resource::EntryNode(NodeId(7)))));

    let err = h
        .orchestrator
        .create_tunnel(new_tunnel(1, 8, 9000))
        .await
        .unwrap_err();
    assert!(matches!(err, PanelError::NotFound(Resource::ExitNode(NodeId(8)))));
}

#[tokio::test]
async fn test_tunnel_port_scoped_to_entry() {
    let h = Harness::new(vec![node(1), node(2), node(3)], None);
    h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();

    let err = h
        .orchestrator
        .create_tunnel(new_tunnel(1, 3, 9000))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PanelError::Conflict(Conflict::PortInUse {
            node: NodeId(1),
            port: 9000
        })
    ));

    h.orchestrator.create_tunnel(new_tunnel(3, 2, 9000)).await.unwrap();
}

#[tokio::test]
async fn test_service_failure_rolls_back_chain() {
    let h = Harness::new(vec![node(1), node(2)], None);
    let tunnel = h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();
    let entry = h.connector.node(NodeId(1));
    entry.fail(Op::CreateService, Failure::Rejected);

    let err = h.orchestrator.start_tunnel(tunnel.id).await.unwrap_err();
    assert!(matches!(
        err,
        PanelError::RemoteFailed(RemoteStep::CreateService)
    ));

    assert!(!entry.has_chain("chain-tunnel-1"));
    assert_eq!(
        entry.mutations(),
        vec![
            Call::CreateChain("chain-tunnel-1".into()),
            Call::CreateService("tunnel-1".into()),
            Call::DeleteChain("chain-tunnel-1".into()),
        ]
    );
    assert_eq!(
        h.store.tunnel_get(tunnel.id).await.unwrap().status,
        RuleStatus::Error
    );
}

#[tokio::test]
async fn test_chain_failure_stops_before_service() {
    let h = Harness::new(vec![node(1), node(2)], Some(OBSERVER_URL));
    let tunnel = h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();
    let entry = h.connector.node(NodeId(1));
    entry.fail(Op::CreateChain, Failure::Timeout);

    let err = h.orchestrator.start_tunnel(tunnel.id).await.unwrap_err();
    assert!(matches!(err, PanelError::RemoteFailed(RemoteStep::CreateChain)));
    assert_eq!(entry.count(Op::CreateObserver), 0);
    assert_eq!(entry.count(Op::CreateService), 0);
    assert_eq!(
        h.store.tunnel_get(tunnel.id).await.unwrap().status,
        RuleStatus::Error
    );
}

#[tokio::test]
async fn test_existing_chain_is_reused() {
    let h = Harness::new(vec![node(1), node(2)], None);
    let tunnel = h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();
    let entry = h.connector.node(NodeId(1));
    entry.put_chain("chain-tunnel-1");

    let started = h.orchestrator.start_tunnel(tunnel.id).await.unwrap();
    assert_eq!(started.status, RuleStatus::Running);
    assert_eq!(started.chain_id.as_deref(), Some("chain-tunnel-1"));
    assert!(entry.service("tunnel-1").is_some());
}

#[tokio::test]
async fn test_offline_exit_blocks_start() {
    let h = Harness::new(
        vec![node(1), node_with_status(2, NodeStatus::Error)],
        None,
    );
    let tunnel = h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();

    let err = h.orchestrator.start_tunnel(tunnel.id).await.unwrap_err();
    assert!(matches!(
        err,
        PanelError::NodeUnavailable {
            node: NodeId(2),
            status: NodeStatus::Error
        }
    ));
    assert_eq!(h.connector.total_calls(), 0);
}

#[tokio::test]
async fn test_unresolvable_exit_host_pins_error() {
    let h = Harness::new(vec![node(1), node(2)], None);
    let tunnel = h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();
    h.store.insert_node(Node {
        api_url: "http://".into(),
        ..node(2)
    });

    let err = h.orchestrator.start_tunnel(tunnel.id).await.unwrap_err();
    assert!(matches!(err, PanelError::Misconfigured { node: NodeId(2), .. }));
    assert_eq!(h.connector.total_calls(), 0);
    assert_eq!(
        h.store.tunnel_get(tunnel.id).await.unwrap().status,
        RuleStatus::Error
    );
}

#[tokio::test]
async fn test_stop_tunnel_removes_service_then_chain() {
    let h = Harness::new(vec![node(1), node(2)], None);
    let tunnel = h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();
    h.orchestrator.start_tunnel(tunnel.id).await.unwrap();
    let entry = h.connector.node(NodeId(1));
    entry.clear_calls();

    let stopped = h.orchestrator.stop_tunnel(tunnel.id).await.unwrap();
    assert_eq!(stopped.status, RuleStatus::Stopped);
    assert_eq!(
        entry.mutations(),
        vec![
            Call::DeleteService("tunnel-1".into()),
            Call::DeleteChain("chain-tunnel-1".into()),
        ]
    );
}

#[tokio::test]
async fn test_update_recopies_relay_port() {
    let h = Harness::new(vec![node(1), node(2), node(3)], None);
    h.store.insert_node(Node {
        relay_port: 9443,
        ..node(3)
    });
    let tunnel = h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();
    assert_eq!(tunnel.relay_port, 8443);

    let updated = h
        .orchestrator
        .update_tunnel(tunnel.id, new_tunnel(1, 3, 9000))
        .await
        .unwrap();
    assert_eq!(updated.exit_node_id, NodeId(3));
    assert_eq!(updated.relay_port, 9443);
}

#[tokio::test]
async fn test_update_running_tunnel_conflicts() {
    let h = Harness::new(vec![node(1), node(2)], None);
    let tunnel = h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();
    h.orchestrator.start_tunnel(tunnel.id).await.unwrap();

    let err = h
        .orchestrator
        .update_tunnel(tunnel.id, new_tunnel(1, 2, 9001))
        .await
        .unwrap_err();
    assert!(matches!(err, PanelError::Conflict(Conflict::RuleRunning)));
}

#[tokio::test]
async fn test_delete_running_tunnel() {
    let h = Harness::new(vec![node(1), node(2)], None);
    let tunnel = h.orchestrator.create_tunnel(new_tunnel(1, 2, 9000)).await.unwrap();
    h.orchestrator.start_tunnel(tunnel.id).await.unwrap();

    h.orchestrator.delete_tunnel(tunnel.id).await.unwrap();

    let entry = h.connector.node(NodeId(1));
    assert!(entry.service("tunnel-1").is_none());
    assert!(!entry.has_chain("chain-tunnel-1"));
    assert!(matches!(
        h.orchestrator.get_tunnel(tunnel.id).await,
        Err(PanelError::NotFound(Resource::Tunnel(TunnelId(1))))
    ));
}
