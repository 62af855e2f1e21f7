use std::path::PathBuf;

use ask_agent_core::{
    Agent, AgentBuilder, AgentOutcome, AgentStep, Error, PromptTemplate, Tool,
    TranscriptStore,
};
use ask_agent_model::ModelProvider;

use crate::tools::SearchTool;

/// Default location of the transcript, relative to the working directory.
const DEFAULT_HISTORY_PATH: &str = "history.txt";

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    history_path: PathBuf,
    search: bool,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self {
            agent_builder,
            history_path: DEFAULT_HISTORY_PATH.into(),
            search: true,
        }
    }

    /// Sets the transcript file.
    #[inline]
    pub fn with_history_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.history_path = path.into();
        self
    }

    /// Enables or disables the built-in search tool.
    #[inline]
    pub fn with_search(mut self, enabled: bool) -> Self {
        self.search = enabled;
        self
    }

    /// Registers an additional tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.agent_builder = self.agent_builder.with_tool(tool);
        self
    }

    /// Replaces the default prompt template.
    #[inline]
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.agent_builder = self.agent_builder.with_template(template);
        self
    }

    /// Adjusts the reasoning loop, e.g. its iteration cap.
    #[inline]
    pub fn configure_agent(
        mut self,
        f: impl FnOnce(AgentBuilder) -> AgentBuilder,
    ) -> Self {
        self.agent_builder = f(self.agent_builder);
        self
    }

    /// Attaches a sink receiving streamed model text.
    #[inline]
    pub fn on_token(
        mut self,
        on_token: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_token(on_token);
        self
    }

    /// Attaches a callback invoked after each tool observation.
    #[inline]
    pub fn on_step(
        mut self,
        on_step: impl Fn(&AgentStep) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_step(on_step);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Result<Session, Error> {
        let mut agent_builder = self.agent_builder;
        if self.search {
            agent_builder = agent_builder.with_tool(SearchTool::new());
        }
        let agent = agent_builder.build()?;
        let store = TranscriptStore::new(self.history_path);

        Ok(Session { agent, store })
    }
}

/// The answer to one question.
#[derive(Debug)]
pub struct Answer {
    /// What the reasoning loop produced.
    pub outcome: AgentOutcome,
    /// Set if the turn could not be appended to the transcript. The answer
    /// itself is still valid.
    pub transcript_error: Option<Error>,
}

impl Answer {
    /// Returns the final answer text.
    #[inline]
    pub fn output(&self) -> &str {
        &self.outcome.output
    }
}

/// A question-answering session over a persisted transcript.
///
/// The session holds a fully configured agent, and it is basically a
/// wrapper around [`Agent`] that threads the transcript through it.
pub struct Session {
    agent: Agent,
    store: TranscriptStore,
}

impl Session {
    /// Returns the underlying agent.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Returns the transcript store.
    #[inline]
    pub fn transcript(&self) -> &TranscriptStore {
        &self.store
    }

    /// Empties the transcript.
    #[inline]
    pub async fn clear_history(&self) -> Result<(), Error> {
        self.store.clear().await
    }

    /// Answers `input` with the transcript as context, then appends the
    /// question and the answer to the transcript.
    pub async fn ask(&self, input: &str) -> Result<Answer, Error> {
        let chat_history = self.store.load().await;
        debug!(
            "loaded {} bytes of history from {}",
            chat_history.len(),
            self.store.path().display()
        );

        let outcome = self.agent.run(input, &chat_history).await?;
        info!(
            "answered after {} iterations and {} tool steps",
            outcome.iterations,
            outcome.steps.len()
        );

        let transcript_error =
            self.store.append(input, &outcome.output).await.err();
        if let Some(err) = &transcript_error {
            error!("failed to save the transcript: {err}");
        }

        Ok(Answer {
            outcome,
            transcript_error,
        })
    }
}
