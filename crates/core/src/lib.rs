//! Core logic of the agent: the reasoning loop, tool registry, prompt
//! template, output parser and transcript store.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
mod error;
mod model_client;
pub mod parser;
mod prompt;
mod scratchpad;
pub mod tool;
pub mod transcript;

pub use agent::{Agent, AgentBuilder, AgentConfig, AgentOutcome};
pub use error::Error;
pub use prompt::{DEFAULT_TEMPLATE, PromptTemplate, PromptVars};
pub use scratchpad::AgentStep;
pub use tool::Tool;
pub use transcript::{Role, Transcript, TranscriptStore, Turn};
