//! rp-panel: Control plane for proxy daemon nodes
//!
//! The panel stores which forwards and tunnels should exist and drives the
//! managed nodes' management APIs to make it so. Three paths write rule
//! state: the orchestrator (start/stop), the sync engine (drift
//! correction), and telemetry ingestion (traffic counters).

pub mod audit;
pub mod client;
pub mod health;
pub mod http;
pub mod orchestrator;
pub mod state;
pub mod store;
pub mod sync;
pub mod telemetry;

pub use orchestrator::Orchestrator;
pub use state::PanelState;
pub use sync::SyncEngine;
