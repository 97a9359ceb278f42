//! Record builders

use rp_core::model::{Node, RuleSpec};
use rp_core::types::{NodeId, NodeStatus, Protocol};

/// Online node `id` named `node-<id>` with a relay port
pub fn node(id: u64) -> Node {
    Node {
        id: NodeId(id),
        name: format!("node-{}", id),
        api_url: format!("http://10.0.0.{}:18080", id),
        username: String::new(),
        password: String::new(),
        status: NodeStatus::Online,
        relay_port: 8443,
        last_check_at: None,
    }
}

/// Node `id` with the given status
pub fn node_with_status(id: u64, status: NodeStatus) -> Node {
    Node {
        status,
        ..node(id)
    }
}

/// Single-target TCP rule listening on `port`
pub fn rule_spec(port: u16) -> RuleSpec {
    RuleSpec {
        name: format!("rule-{}", port),
        protocol: Protocol::Tcp,
        listen_port: port,
        targets: vec!["192.0.2.10:80".to_string()],
        strategy: None,
        enable_tls: false,
        remark: String::new(),
    }
}
