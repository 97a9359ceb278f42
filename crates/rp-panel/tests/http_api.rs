//! HTTP API tests
//!
//! Requests go straight into the router with `oneshot`; nodes are fakes.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use rp_core::config::PanelConfig;
use rp_core::model::Node;
use rp_core::types::{NodeId, NodeStatus};
use rp_panel::audit::TracingAudit;
use rp_panel::http::build_router;
use rp_panel::store::MemoryStore;
use rp_panel::PanelState;
use rp_test_utils::fixtures::{node, node_with_status};
use rp_test_utils::{FakeConnector, Failure, Op};

struct TestApp {
    router: Router,
    connector: Arc<FakeConnector>,
}

fn test_app(nodes: Vec<Node>, public_url: Option<&str>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    for node in nodes {
        store.insert_node(node);
    }
    let connector = Arc::new(FakeConnector::new());
    let config = PanelConfig {
        public_url: public_url.map(str::to_string),
        ..Default::default()
    };
    let state = PanelState::new(config, store, connector.clone(), Arc::new(TracingAudit));

    TestApp {
        router: build_router(Arc::new(state)),
        connector,
    }
}

async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn forward_body(node: u64, port: u16) -> Value {
    json!({
        "node_id": node,
        "name": format!("web-{}", port),
        "protocol": "tcp",
        "listen_port": port,
        "targets": ["192.0.2.10:80", "192.0.2.11:80"],
        "strategy": "hash"
    })
}

#[tokio::test]
async fn test_healthz() {
    let app = test_app(vec![], None);
    let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_forward_create_start_list() {
    let app = test_app(vec![node(1)], Some("https://panel.example.com/"));

    let (status, created) = send(&app, "POST", "/api/v1/forwards", Some(forward_body(1, 8080))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);
    assert_eq!(created["status"], "stopped");

    let (status, started) = send(&app, "POST", "/api/v1/forwards/1/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "running");
    assert_eq!(started["service_id"], "forward-1");

    let fake = app.connector.node(NodeId(1));
    let service = fake.service("forward-1").unwrap();
    assert_eq!(service.forwarder.unwrap().selector.unwrap().strategy, "hash");

    let (status, listed) = send(&app, "GET", "/api/v1/forwards?status=running", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (_, listed) = send(&app, "GET", "/api/v1/forwards?status=stopped", None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (_, listed) = send(&app, "GET", "/api/v1/forwards?keyword=WEB", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_forward_is_404_envelope() {
    let app = test_app(vec![node(1)], None);
    let (status, body) = send(&app, "GET", "/api/v1/forwards/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"code": "NOT_FOUND", "message": "Forward 99 not found"}));
}

#[tokio::test]
async fn test_port_conflict_is_409() {
    let app = test_app(vec![node(1)], None);
    send(&app, "POST", "/api/v1/forwards", Some(forward_body(1, 8080))).await;

    let (status, body) = send(&app, "POST", "/api/v1/forwards", Some(forward_body(1, 8080))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_invalid_spec_is_400() {
    let app = test_app(vec![node(1)], None);
    let mut body = forward_body(1, 8080);
    body["targets"] = json!([]);

    let (status, body) = send(&app, "POST", "/api/v1/forwards", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_start_on_offline_node_is_409() {
    let app = test_app(vec![node_with_status(1, NodeStatus::Offline)], None);
    send(&app, "POST", "/api/v1/forwards", Some(forward_body(1, 8080))).await;

    let (status, body) = send(&app, "POST", "/api/v1/forwards/1/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NODE_UNAVAILABLE");
    assert_eq!(app.connector.total_calls(), 0);
}

#[tokio::test]
async fn test_remote_failure_is_502() {
    let app = test_app(vec![node(1)], None);
    send(&app, "POST", "/api/v1/forwards", Some(forward_body(1, 8080))).await;
    app.connector
        .node(NodeId(1))
        .fail(Op::CreateService, Failure::Rejected);

    let (status, body) = send(&app, "POST", "/api/v1/forwards/1/start", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "REMOTE_FAILED");

    let (_, forward) = send(&app, "GET", "/api/v1/forwards/1", None).await;
    assert_eq!(forward["status"], "error");
}

#[tokio::test]
async fn test_delete_forward_is_204() {
    let app = test_app(vec![node(1)], None);
    send(&app, "POST", "/api/v1/forwards", Some(forward_body(1, 8080))).await;

    let (status, body) = send(&app, "DELETE", "/api/v1/forwards/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, "GET", "/api/v1/forwards/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tunnel_errors() {
    let exit = Node {
        relay_port: 0,
        ..node(3)
    };
    let app = test_app(vec![node(1), node(2), exit], None);

    let tunnel = |entry: u64, exit: u64| {
        json!({
            "entry_node_id": entry,
            "exit_node_id": exit,
            "name": "t",
            "listen_port": 9000,
            "targets": ["192.0.2.10:443"]
        })
    };

    let (status, body) = send(&app, "POST", "/api/v1/tunnels", Some(tunnel(1, 1))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, body) = send(&app, "POST", "/api/v1/tunnels", Some(tunnel(1, 3))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "MISCONFIGURED");

    let (status, created) = send(&app, "POST", "/api/v1/tunnels", Some(tunnel(1, 2))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["relay_port"], 8443);

    let (status, started) = send(&app, "POST", "/api/v1/tunnels/1/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["chain_id"], "chain-tunnel-1");

    let (_, counts) = send(&app, "GET", "/api/v1/tunnels/stats", None).await;
    assert_eq!(counts, json!({"total": 1, "running": 1, "stopped": 0, "error": 0}));
}

#[tokio::test]
async fn test_observer_report() {
    let app = test_app(vec![node(1)], None);
    send(&app, "POST", "/api/v1/forwards", Some(forward_body(1, 8080))).await;

    let (status, body) = send(&app, "POST", "/api/v1/observer/report", Some(json!("not a report"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"ok": false}));

    let report = json!({
        "events": [{
            "kind": "service",
            "service": "forward-1",
            "type": "stats",
            "stats": {"totalConns": 3, "inputBytes": 100, "outputBytes": 50}
        }]
    });
    let (status, body) = send(&app, "POST", "/api/v1/observer/report", Some(report)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (_, forward) = send(&app, "GET", "/api/v1/forwards/1", None).await;
    assert_eq!(forward["input_bytes"], 100);
    assert_eq!(forward["total_bytes"], 150);
    assert_eq!(forward["total_requests"], 3);
}

#[tokio::test]
async fn test_nodes_hide_credentials() {
    let mut secured = node(1);
    secured.username = "admin".into();
    secured.password = "hunter2".into();
    let app = test_app(vec![secured, node_with_status(2, NodeStatus::Offline)], None);

    let (status, nodes) = send(&app, "GET", "/api/v1/nodes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(nodes.as_array().unwrap().len(), 2);
    assert!(!nodes.to_string().contains("hunter2"));

    let (status, body) = send(&app, "GET", "/api/v1/nodes/5", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Node 5 not found");
}

#[tokio::test]
async fn test_node_live_config() {
    let app = test_app(vec![node(1)], None);
    app.connector
        .node(NodeId(1))
        .put_service("forward-3", rp_protocol::ServiceState::Running);

    let (status, config) = send(&app, "GET", "/api/v1/nodes/1/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["services"][0]["name"], "forward-3");
    assert_eq!(config["services"][0]["status"]["state"], "running");

    app.connector
        .node(NodeId(1))
        .fail(Op::GetConfig, Failure::Transport);
    let (status, body) = send(&app, "GET", "/api/v1/nodes/1/config", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "REMOTE_FAILED");
}

#[tokio::test]
async fn test_dashboard_stats() {
    let app = test_app(
        vec![node(1), node_with_status(2, NodeStatus::Offline)],
        None,
    );
    send(&app, "POST", "/api/v1/forwards", Some(forward_body(1, 8080))).await;
    send(&app, "POST", "/api/v1/forwards", Some(forward_body(1, 8081))).await;
    send(&app, "POST", "/api/v1/forwards/2/start", None).await;

    let (status, stats) = send(&app, "GET", "/api/v1/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["nodes"]["total"], 2);
    assert_eq!(stats["nodes"]["online"], 1);
    assert_eq!(stats["nodes"]["offline"], 1);
    assert_eq!(stats["forwards"]["running"], 1);
    assert_eq!(stats["forwards"]["stopped"], 1);
    assert_eq!(stats["tunnels"]["total"], 0);
}
