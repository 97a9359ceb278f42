//! Management API client for proxy daemon nodes

mod connector;
mod node;

pub use connector::HttpConnector;
pub use node::NodeClient;
