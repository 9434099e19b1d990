//! Provider-agnostic types for talking to chat models.
//!
//! The agent loop only ever speaks in terms of this crate: a request is a
//! list of messages plus the tools the model may call, and a response is a
//! stream of events (text deltas, tool calls, completion). Concrete
//! providers live in their own crates and translate to and from their wire
//! format.
//!
//! Nothing here performs I/O.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;
mod tool_call;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
pub use tool_call::*;
