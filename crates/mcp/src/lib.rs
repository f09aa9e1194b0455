//! A Model Context Protocol client for servers running as child processes.
//!
//! Servers are described by [`ServerDescriptor`]s and launched through
//! [`rmcp`]'s child process transport. [`McpClient`] talks to one server,
//! [`McpServers`] starts and stops a whole group of them.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod client;
mod descriptor;
mod error;
pub mod proto;
mod servers;

pub use client::{DEFAULT_REQUEST_TIMEOUT, McpClient};
pub use descriptor::ServerDescriptor;
pub use error::{Error, ErrorKind, StartError};
pub use servers::{McpServers, RunningServer};
