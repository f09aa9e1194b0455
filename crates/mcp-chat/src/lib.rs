//! A terminal chat client wiring an LLM agent to MCP tool servers.
//!
//! The pieces are usable on their own: [`config`] turns `mcp-config.json`
//! into server descriptors, [`bootstrap`] builds a [`SessionBuilder`] from
//! the environment, a [`Session`] owns the running servers and the agent,
//! and [`console`] drives a read-print loop over any reader and writer.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod bootstrap;
pub mod config;
pub mod console;
mod session;
pub mod tools;

pub use session::{Session, SessionBuilder, SessionError};

/// Re-exports of [`mcp_chat_core`] crate.
pub mod core {
    pub use mcp_chat_core::*;
}

/// Re-exports of [`mcp_chat_mcp`] crate.
pub mod mcp {
    pub use mcp_chat_mcp::*;
}
