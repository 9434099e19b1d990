//! The agent loop: sampling the model, running the tools it asks for,
//! and feeding the results back until it produces an answer.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
mod conversation;
mod error;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, ITERATION_LIMIT_ANSWER};
pub use error::Error;
pub use lookout_model::ToolCallRequest;
