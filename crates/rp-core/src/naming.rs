//! Deterministic names for remote objects
//!
//! The panel keeps no transactional link to a daemon's state. Names derived
//! from local record IDs are the only join key between a record and the
//! service, chain, or observer it created, so these formats must never change:
//!
//! - forward service: `forward-<id>`
//! - tunnel service: `tunnel-<id>`
//! - tunnel chain: `chain-tunnel-<id>`
//! - observer: `observer-<node name>-<id>`

use crate::types::{ForwardId, TunnelId};

const FORWARD_PREFIX: &str = "forward-";
const TUNNEL_PREFIX: &str = "tunnel-";
const CHAIN_PREFIX: &str = "chain-tunnel-";

/// Service name for a forward
pub fn forward_service(id: ForwardId) -> String {
    format!("{}{}", FORWARD_PREFIX, id)
}

/// Service name for a tunnel
pub fn tunnel_service(id: TunnelId) -> String {
    format!("{}{}", TUNNEL_PREFIX, id)
}

/// Chain name for a tunnel
pub fn tunnel_chain(id: TunnelId) -> String {
    format!("{}{}", CHAIN_PREFIX, id)
}

/// Observer name for a rule on a node
pub fn observer(node_name: &str, rule_id: u64) -> String {
    format!("observer-{}-{}", node_name, rule_id)
}

/// The rule a service name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRef {
    Forward(ForwardId),
    Tunnel(TunnelId),
}

impl ServiceRef {
    /// Parse `forward-<id>` or `tunnel-<id>`.
    ///
    /// Returns `None` for any other shape, including empty or non-decimal IDs.
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(rest) = name.strip_prefix(FORWARD_PREFIX) {
            parse_id(rest).map(|id| ServiceRef::Forward(ForwardId(id)))
        } else if let Some(rest) = name.strip_prefix(TUNNEL_PREFIX) {
            parse_id(rest).map(|id| ServiceRef::Tunnel(TunnelId(id)))
        } else {
            None
        }
    }
}

fn parse_id(digits: &str) -> Option<u64> {
    // u64::from_str accepts a leading '+'
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
