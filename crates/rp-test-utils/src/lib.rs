//! rp-test-utils: Shared test utilities for Relay Panel
//!
//! Provides an in-process fake node for orchestrator and sync tests, and a
//! mock daemon HTTP server for exercising the real management API client.

pub mod fake_node;
pub mod fixtures;
pub mod mock_daemon;

pub use fake_node::{Call, FakeConnector, FakeNode, Failure, Op};
pub use mock_daemon::MockDaemon;
