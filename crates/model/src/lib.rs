//! Provider-neutral types for talking to LLMs.
//!
//! The agent core only speaks the protocol defined here, and each model
//! provider crate translates it to its own wire format. Nothing in this
//! crate performs I/O; the types are the contract implementors adhere to.

#![deny(missing_docs)]

mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
