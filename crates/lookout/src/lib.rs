//! A search assistant that answers questions with an agent backed by
//! Wikipedia, arXiv and web search lookups.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library: [`TranscriptSession`] keeps the chat transcript and
//! forwards each question to any [`AgentRunner`].

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod session;
pub mod tools;

pub use config::{
    API_KEY_VAR, ArxivConfig, BASE_URL_VAR, Config, ConfigError, LookupConfig,
    MAX_ITERATIONS_VAR, MODEL_VAR, WebSearchConfig, WikipediaConfig,
};
pub use session::{
    AgentRunner, GREETING, Role, RunnerError, Submission, TranscriptSession,
    Turn,
};

/// Re-exports of [`lookout_core`] crate.
pub mod core {
    pub use lookout_core::*;
}
