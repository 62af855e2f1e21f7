//! Tool call supports.

mod error;
mod object;
mod registry;

pub use error::{Error, ErrorKind};
pub(crate) use object::{AnyTool, ToolObject};
pub use registry::Registry;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless. The model selects a
/// tool by its exact name, and passes it a single line of free text.
///
/// The tool can be context-aware, meaning it can access additional information
/// about the current execution context, such as an HTTP client or an
/// endpoint. To do this, make the context an immutable state of the tool,
/// which can be set during initialization, and copy it when executing.
pub trait Tool: Send + Sync + 'static {
    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool, shown to the model.
    fn description(&self) -> &str;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe. It may be called more
    /// than once for the same input when retried.
    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
