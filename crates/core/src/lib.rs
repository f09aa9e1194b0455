//! The agent: a model, a set of tools and the loop running between them.
//!
//! [`Agent`] runs one conversation turn at a time. Each turn sends the
//! history to the model, executes the tools it asks for, feeds their
//! results back, and stops once the model answers with plain text.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentError, AgentErrorKind, RunResult};
