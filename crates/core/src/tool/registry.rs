use std::fmt::{self, Debug};

use super::{AnyTool, Tool, ToolObject, ToolResult};
use crate::Error;

/// The ordered set of tools exposed to the model.
///
/// Tools are kept in registration order, which is also the order the
/// prompt lists them in. Names are unique.
#[derive(Default)]
pub struct Registry {
    tools: Vec<Box<dyn ToolObject>>,
}

impl Registry {
    /// Registers a tool, failing if its name is already taken.
    #[inline]
    pub fn register<T: Tool>(&mut self, tool: T) -> Result<(), Error> {
        self.insert(Box::new(AnyTool(tool)))
    }

    pub(crate) fn insert(
        &mut self,
        tool: Box<dyn ToolObject>,
    ) -> Result<(), Error> {
        if self.get(tool.name()).is_some() {
            return Err(Error::DuplicateTool(tool.name().to_owned()));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<&dyn ToolObject> {
        self.tools
            .iter()
            .find(|tool| tool.name() == name)
            .map(|tool| &**tool)
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// Renders one `name: description` line per tool.
    pub fn descriptions(&self) -> String {
        self.tools
            .iter()
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Calls the named tool once.
    ///
    /// The outer error is [`Error::UnknownTool`]; the inner result is
    /// whatever the tool returned, untouched.
    pub async fn invoke(
        &self,
        name: &str,
        input: &str,
    ) -> Result<ToolResult, Error> {
        let Some(tool) = self.get(name) else {
            warn!("tool not found: {name}");
            return Err(Error::UnknownTool {
                name: name.to_owned(),
            });
        };
        trace!("invoking tool {name} with input: {input:?}");
        Ok(tool.execute(input.to_owned()).await)
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("tools", &self.names())
            .finish()
    }
}
