//! An agent that answers one question per invocation, optionally using a
//! web search, and keeps a plain-text transcript between invocations.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring the agent into your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod session;
pub mod tools;

pub use session::{Answer, Session, SessionBuilder};

/// Re-exports of [`ask_agent_core`] crate.
pub mod core {
    pub use ask_agent_core::*;
}
