mod builder;

use std::time::Duration;

use ask_agent_model::ModelRequest;
use backoff::ExponentialBackoffBuilder;
use tracing::Instrument;

use crate::model_client::{ModelClient, TokenSink};
use crate::parser::{self, ParsedOutput};
use crate::prompt::{PromptTemplate, PromptVars};
use crate::scratchpad::{self, AgentStep};
use crate::tool::{self, Registry};
use crate::Error;
pub use builder::AgentBuilder;

/// Makes the model stop before writing an observation itself.
const STOP_SEQUENCE: &str = "\nObservation";
const INVALID_FORMAT: &str = "Invalid format, please follow the Thought/Action/Action Input or Thought/Final Answer pattern";
const EXCEPTION_ACTION: &str = "_Exception";

/// Tunables of the reasoning loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentConfig {
    /// Turn parse errors and unknown tools into corrective observations
    /// instead of failing.
    pub handle_parsing_errors: bool,
    /// How many corrective observations one invocation may produce.
    pub max_parsing_errors: usize,
    /// How many model calls one invocation may make.
    pub max_iterations: usize,
    /// Time limit of a single tool call.
    pub tool_timeout: Duration,
    /// Extra attempts for a failing tool call.
    pub tool_retries: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            handle_parsing_errors: true,
            max_parsing_errors: 3,
            max_iterations: 15,
            tool_timeout: Duration::from_secs(30),
            tool_retries: 2,
        }
    }
}

/// Result of one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentOutcome {
    /// The final answer.
    pub output: String,
    /// The scratchpad, for inspection only.
    pub steps: Vec<AgentStep>,
    /// Number of model calls made.
    pub iterations: usize,
}

/// A reasoning loop bound to a model, a set of tools and a prompt.
///
/// The agent alternates between asking the model and calling the tool it
/// names, until the model gives a final answer. Each call to
/// [`Agent::run`] starts with an empty scratchpad.
pub struct Agent {
    model_client: ModelClient,
    registry: Registry,
    template: PromptTemplate,
    config: AgentConfig,
    on_token: Option<TokenSink>,
    on_step: Option<Box<dyn Fn(&AgentStep) + Send + Sync>>,
}

impl Agent {
    /// Returns the registered tools.
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the loop configuration.
    #[inline]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Answers `input`, with `chat_history` rendered as prior context.
    pub async fn run(
        &self,
        input: &str,
        chat_history: &str,
    ) -> Result<AgentOutcome, Error> {
        let tools = self.registry.descriptions();
        let tool_names = self.registry.names().join(", ");
        let mut steps: Vec<AgentStep> = vec![];
        let mut parse_errors = 0;

        for iteration in 1..=self.config.max_iterations {
            let scratchpad = scratchpad::render(&steps);
            let prompt = self.template.render(&PromptVars {
                tools: &tools,
                tool_names: &tool_names,
                chat_history,
                input,
                agent_scratchpad: &scratchpad,
            });
            let request = ModelRequest::new(prompt).with_stop(STOP_SEQUENCE);

            debug!("iteration {iteration}: querying the model");
            let completion = self
                .model_client
                .send_request(request, self.on_token.clone())
                .await
                .map_err(Error::ModelEndpoint)?;

            let step = match parser::parse(&completion.text) {
                Ok(ParsedOutput::Finish(finish)) => {
                    debug!("got a final answer after {iteration} iterations");
                    return Ok(AgentOutcome {
                        output: finish.output,
                        steps,
                        iterations: iteration,
                    });
                }
                Ok(ParsedOutput::Action(action)) => {
                    let observation = match self
                        .call_tool(&action.tool, &action.tool_input)
                        .await
                    {
                        Ok(observation) => observation,
                        Err(err @ Error::UnknownTool { .. }) => {
                            self.tolerate(&mut parse_errors, err)?;
                            format!(
                                "{} is not a valid tool, try one of [{}].",
                                action.tool, tool_names
                            )
                        }
                        Err(err) => return Err(err),
                    };
                    AgentStep {
                        thought: action.thought,
                        action: action.tool,
                        action_input: action.tool_input,
                        observation,
                        log: action.log,
                    }
                }
                Err(failure) => {
                    self.tolerate(
                        &mut parse_errors,
                        Error::ParseError {
                            reason: failure.reason.to_owned(),
                            output: completion.text.clone(),
                        },
                    )?;
                    AgentStep {
                        thought: String::new(),
                        action: EXCEPTION_ACTION.to_owned(),
                        action_input: failure.reason.to_owned(),
                        observation: INVALID_FORMAT.to_owned(),
                        log: completion.text,
                    }
                }
            };

            if let Some(on_step) = &self.on_step {
                on_step(&step);
            }
            steps.push(step);
        }

        warn!(
            "no final answer after {} iterations",
            self.config.max_iterations
        );
        Err(Error::MaxIterationsExceeded(self.config.max_iterations))
    }

    fn tolerate(
        &self,
        parse_errors: &mut usize,
        err: Error,
    ) -> Result<(), Error> {
        if !self.config.handle_parsing_errors
            || *parse_errors >= self.config.max_parsing_errors
        {
            return Err(err);
        }
        *parse_errors += 1;
        warn!("recovering from: {err}");
        Ok(())
    }

    /// Calls a tool through the registry with timeout and retries,
    /// returning the observation.
    ///
    /// Timeouts and invalid input become observations. Invalid input and
    /// unknown tools are never retried.
    async fn call_tool(&self, name: &str, input: &str) -> Result<String, Error> {
        let timeout = self.config.tool_timeout;
        let retries = self.config.tool_retries;
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_elapsed_time(None)
            .build();

        let mut attempts = 0;
        let result = backoff::future::retry(policy, || {
            attempts += 1;
            let attempt = attempts;
            let fut = self.registry.invoke(name, input);
            async move {
                let err = match tokio::time::timeout(timeout, fut).await {
                    Ok(Ok(Ok(output))) => return Ok(output),
                    Ok(Ok(Err(err))) => err,
                    Ok(Err(err)) => return Err(backoff::Error::permanent(err)),
                    Err(_) => tool::Error::timeout(),
                };
                let retryable = err.kind() == tool::ErrorKind::ExecutionError
                    && attempt <= retries;
                if retryable {
                    warn!("attempt {attempt} failed: {err}");
                }
                let err = Error::ToolInvocation {
                    tool: name.to_owned(),
                    source: err,
                };
                if retryable {
                    Err(backoff::Error::transient(err))
                } else {
                    Err(backoff::Error::permanent(err))
                }
            }
        })
        .instrument(debug_span!("tool call", tool = name))
        .await;

        match result {
            Err(Error::ToolInvocation { source, .. })
                if source.kind() == tool::ErrorKind::Timeout =>
            {
                warn!("tool {name} timed out");
                Ok(format!("Tool '{name}' timed out after {timeout:?}"))
            }
            Err(Error::ToolInvocation { source, .. })
                if source.kind() == tool::ErrorKind::InvalidInput =>
            {
                warn!("tool {name} rejected its input: {source}");
                Ok(format!(
                    "Invalid input for tool '{name}': {}",
                    source.reason()
                ))
            }
            result => result,
        }
    }
}
