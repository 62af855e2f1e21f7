mod chunks;
mod event_stream;

pub use chunks::{Chunks, Error as ChunksError};
pub use event_stream::EventStream;

#[cfg(test)]
pub(crate) use event_stream::tests as event_stream_tests;
