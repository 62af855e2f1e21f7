use std::io;

use ask_agent_model::ModelProviderError;

use crate::tool;

/// Errors that terminate an agent invocation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model asked for a tool that is not registered.
    #[error("unknown tool: {name}")]
    UnknownTool {
        /// Tool name as written by the model.
        name: String,
    },

    /// The model output matched neither the action nor the final answer
    /// pattern.
    #[error("could not parse model output ({reason}): {output}")]
    ParseError {
        /// What was missing.
        reason: String,
        /// The raw completion text.
        output: String,
    },

    /// A tool kept failing after all retries.
    #[error("tool '{tool}' failed: {source}")]
    ToolInvocation {
        /// Name of the failing tool.
        tool: String,
        /// Error from the last attempt.
        #[source]
        source: tool::Error,
    },

    /// The language model endpoint returned an error.
    #[error("model endpoint error: {0}")]
    ModelEndpoint(Box<dyn ModelProviderError>),

    /// The transcript file could not be written.
    #[error("transcript I/O error: {0}")]
    TranscriptIo(#[from] io::Error),

    /// The loop called the model too many times without a final answer.
    #[error("agent stopped after {0} iterations without a final answer")]
    MaxIterationsExceeded(usize),

    /// Two tools were registered under the same name.
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    /// A prompt template lacks a required placeholder.
    #[error("prompt template is missing the {{{0}}} placeholder")]
    MissingVariable(&'static str),
}

impl Error {
    /// Returns `true` if the error may be turned into a corrective
    /// observation when parsing errors are tolerated.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UnknownTool { .. } | Error::ParseError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::MissingVariable("tools").to_string(),
            "prompt template is missing the {tools} placeholder"
        );
        assert_eq!(
            Error::UnknownTool {
                name: "Calculator".to_owned()
            }
            .to_string(),
            "unknown tool: Calculator"
        );
        assert_eq!(
            Error::DuplicateTool("Search".to_owned()).to_string(),
            "duplicate tool name: Search"
        );
    }

    #[test]
    fn test_recoverable() {
        assert!(
            Error::ParseError {
                reason: "x".to_owned(),
                output: String::new()
            }
            .is_recoverable()
        );
        assert!(!Error::MaxIterationsExceeded(15).is_recoverable());
    }
}
