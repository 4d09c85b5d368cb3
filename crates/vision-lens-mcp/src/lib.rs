//! Vision Lens MCP Server: ask a vision model what is in a local image.

pub mod config;
pub mod protocol;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{ConfigOptions, ServerConfig};
pub use protocol::ProtocolHandler;
pub use tools::ToolContext;
pub use transport::StdioTransport;
