//! Agent tools backed by MCP servers.

mod mcp;

pub use mcp::{McpTool, render_content};
