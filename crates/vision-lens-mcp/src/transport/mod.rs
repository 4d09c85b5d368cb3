//! Transport layer for MCP communication.

pub mod framing;
pub mod stdio;

pub use framing::LineFramer;
pub use stdio::StdioTransport;
