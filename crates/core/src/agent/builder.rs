use std::time::Duration;

use ask_agent_model::ModelProvider;

use super::{Agent, AgentConfig};
use crate::model_client::{ModelClient, TokenSink};
use crate::prompt::PromptTemplate;
use crate::scratchpad::AgentStep;
use crate::tool::{AnyTool, Registry, Tool, ToolObject};
use crate::Error;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    tools: Vec<Box<dyn ToolObject>>,
    template: PromptTemplate,
    config: AgentConfig,
    on_token: Option<TokenSink>,
    on_step: Option<Box<dyn Fn(&AgentStep) + Send + Sync>>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: vec![],
            template: PromptTemplate::default(),
            config: AgentConfig::default(),
            on_token: None,
            on_step: None,
        }
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Box::new(AnyTool(tool)));
        self
    }

    /// Replaces the default prompt template.
    #[inline]
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Replaces the whole loop configuration.
    #[inline]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets whether malformed output is answered with a corrective
    /// observation.
    #[inline]
    pub fn handle_parsing_errors(mut self, enabled: bool) -> Self {
        self.config.handle_parsing_errors = enabled;
        self
    }

    /// Sets how many corrective observations are allowed.
    #[inline]
    pub fn max_parsing_errors(mut self, max: usize) -> Self {
        self.config.max_parsing_errors = max;
        self
    }

    /// Sets how many model calls one invocation may make.
    #[inline]
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    /// Sets the time limit of a single tool call.
    #[inline]
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    /// Sets how many times a failing tool call is retried.
    #[inline]
    pub fn tool_retries(mut self, retries: u32) -> Self {
        self.config.tool_retries = retries;
        self
    }

    /// Attaches a sink receiving streamed model text as it arrives.
    ///
    /// The sink must not block; it runs inline with the stream.
    #[inline]
    pub fn on_token(
        mut self,
        on_token: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_token = Some(std::sync::Arc::new(on_token));
        self
    }

    /// Attaches a callback invoked after each observation.
    #[inline]
    pub fn on_step(
        mut self,
        on_step: impl Fn(&AgentStep) + Send + Sync + 'static,
    ) -> Self {
        self.on_step = Some(Box::new(on_step));
        self
    }

    /// Builds the agent, rejecting duplicate tool names.
    pub fn build(self) -> Result<Agent, Error> {
        let AgentBuilder {
            model_client,
            tools,
            template,
            config,
            on_token,
            on_step,
        } = self;

        let mut registry = Registry::default();
        for tool in tools {
            registry.insert(tool)?;
        }

        Ok(Agent {
            model_client,
            registry,
            template,
            config,
            on_token,
            on_step,
        })
    }
}
