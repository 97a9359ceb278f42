//! rp-core: Core abstractions and configuration for Relay Panel
//!
//! This crate provides the domain model (nodes, forwards, tunnels), the
//! naming convention that joins local records to remote daemon objects, the
//! remote-state mapping, error types, configuration, and the async traits
//! the panel's stores and remote clients implement.

pub mod config;
pub mod error;
pub mod model;
pub mod naming;
pub mod status;
pub mod time;
pub mod traits;
pub mod types;

pub use error::PanelError;
pub use types::{ForwardId, NodeId, TunnelId};
