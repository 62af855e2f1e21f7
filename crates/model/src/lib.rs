//! An abstraction layer for text-completion LLMs.
//!
//! This crate establishes an unified protocol for the agent to interact
//! with various supported model backends, so that the reasoning loop can
//! seamlessly switch between them without modifying the core codebase.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.
//!
//! The protocol is deliberately text-only: a request is one rendered
//! prompt plus stop sequences, and a response is a stream of text deltas.
//! Tool selection happens in the prompt text, not in the provider API.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
