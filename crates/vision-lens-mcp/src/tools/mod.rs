//! MCP tool implementations.

pub mod analyze_image;
pub mod registry;

pub use registry::{ToolContext, ToolRegistry};
