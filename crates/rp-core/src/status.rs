//! Mapping from observed daemon state to panel status
//!
//! Reconciliation compares these results with stored status. New daemon
//! states must be added to the matches below; until then they land in the
//! [`ServiceState::Other`] arm and count as stopped.

use rp_protocol::ServiceState;

use crate::types::RuleStatus;

/// Status of a forward whose service reports `state`
pub fn forward_status(state: &ServiceState) -> RuleStatus {
    match state {
        ServiceState::Ready | ServiceState::Running => RuleStatus::Running,
        ServiceState::Failed => RuleStatus::Error,
        // Absent, closed, or unknown: nothing is listening
        ServiceState::Closed | ServiceState::Stopped | ServiceState::Other(_) => {
            RuleStatus::Stopped
        }
    }
}

/// Status of a tunnel whose service reports `state`.
///
/// A live service without its chain has no egress path, which is a fault
/// rather than a stopped tunnel.
pub fn tunnel_status(state: &ServiceState, chain_present: bool) -> RuleStatus {
    match forward_status(state) {
        RuleStatus::Running if !chain_present => RuleStatus::Error,
        status => status,
    }
}
