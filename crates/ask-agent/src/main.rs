//! Answers one question per invocation and records it in a transcript.

#[macro_use]
extern crate tracing;

use std::io::{IsTerminal as _, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context as _, Result, bail};
use ask_agent::SessionBuilder;
use ask_agent::core::PromptTemplate;
use ask_agent_bedrock_model::{
    BedrockConfigBuilder, BedrockProvider, Credentials,
};
use ask_agent_ollama_model::{OllamaConfigBuilder, OllamaProvider};
use ask_agent_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use clap::{Parser, ValueEnum};
use owo_colors::OwoColorize;

const TOKEN_PREFIX: &str = "    🖳";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Provider {
    /// Anthropic Claude on Amazon Bedrock.
    Bedrock,
    /// OpenAI-compatible chat completions.
    Openai,
    /// A local Ollama server.
    Ollama,
}

/// Ask a language model agent a question, with optional web search.
#[derive(Debug, Parser)]
#[command(name = "ask-agent", version, about)]
struct Cli {
    /// The question. Words are joined with spaces.
    #[arg(required = true, value_name = "INPUT")]
    input: Vec<String>,

    /// Model backend.
    #[arg(long, env = "LLM_PROVIDER", default_value = "ollama")]
    provider: Provider,

    /// Transcript file.
    #[arg(long, env = "ASK_AGENT_HISTORY", default_value = "history.txt")]
    history: PathBuf,

    /// Empty the transcript before asking.
    #[arg(long)]
    clear_history: bool,

    /// Do not offer the web search tool.
    #[arg(long)]
    no_search: bool,

    /// Fail on malformed model output instead of asking again.
    #[arg(long)]
    strict: bool,

    /// Maximum number of model calls.
    #[arg(long, default_value_t = 15)]
    max_iterations: usize,

    /// Time limit of a tool call, in seconds.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    tool_timeout: u64,

    /// Replace the built-in ReAct prompt.
    #[arg(long, value_name = "PATH")]
    prompt_file: Option<PathBuf>,

    /// Do not stream model output to stderr.
    #[arg(long)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".bright_red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let input = cli.input.join(" ");
    if input.trim().is_empty() {
        bail!("the question is empty");
    }

    let builder = match cli.provider {
        Provider::Bedrock => {
            SessionBuilder::with_model_provider(bedrock(&system_env)?)
        }
        Provider::Openai => {
            SessionBuilder::with_model_provider(openai(&system_env)?)
        }
        Provider::Ollama => {
            SessionBuilder::with_model_provider(ollama(&system_env))
        }
    };
    debug!("using provider {:?}", cli.provider);
    let session = configure(&cli, builder)?.build()?;

    if cli.clear_history {
        session.clear_history().await.with_context(|| {
            format!("failed to clear {}", cli.history.display())
        })?;
    }

    let answer = session.ask(&input).await?;
    println!();
    println!("{}", answer.output());

    if let Some(err) = answer.transcript_error {
        return Err(err).with_context(|| {
            format!("failed to save history to {}", cli.history.display())
        });
    }
    Ok(())
}

/// Applies the command line options to a session.
fn configure(cli: &Cli, mut builder: SessionBuilder) -> Result<SessionBuilder> {
    if let Some(path) = &cli.prompt_file {
        let text = fs::read_to_string(path).with_context(|| {
            format!("failed to read prompt file {}", path.display())
        })?;
        builder = builder.with_template(PromptTemplate::new(text)?);
    }
    if !cli.quiet {
        builder = builder.on_token(token_printer());
    }

    Ok(builder
        .with_history_path(&cli.history)
        .with_search(!cli.no_search)
        .configure_agent(|agent| {
            agent
                .handle_parsing_errors(!cli.strict)
                .max_iterations(cli.max_iterations)
                .tool_timeout(Duration::from_secs(cli.tool_timeout))
        }))
}

/// Looks up a configuration variable.
type Env<'a> = &'a dyn Fn(&str) -> Option<String>;

fn system_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn bedrock(env: Env<'_>) -> Result<BedrockProvider> {
    let access_key = env("AWS_ACCESS_KEY")
        .context("AWS_ACCESS_KEY environment variable is not set")?;
    let secret_key = env("AWS_SECRET_ACCESS_KEY")
        .context("AWS_SECRET_ACCESS_KEY environment variable is not set")?;
    let mut credentials = Credentials::new(access_key, secret_key);
    if let Some(token) = env("AWS_SESSION_TOKEN") {
        credentials = credentials.with_session_token(token);
    }

    let mut config = BedrockConfigBuilder::with_credentials(credentials);
    if let Some(region) = env("AWS_REGION") {
        config = config.with_region(region);
    }
    if let Some(model_id) = env("BEDROCK_MODEL_ID") {
        config = config.with_model_id(model_id);
    }
    Ok(BedrockProvider::new(config.build()))
}

fn openai(env: Env<'_>) -> Result<OpenAIProvider> {
    let api_key = env("OPENAI_API_KEY")
        .context("OPENAI_API_KEY environment variable is not set")?;
    let mut config = OpenAIConfigBuilder::with_api_key(api_key);
    if let Some(base_url) = env("OPENAI_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    if let Some(model) = env("OPENAI_MODEL") {
        config = config.with_model(model);
    }
    Ok(OpenAIProvider::new(config.build()))
}

fn ollama(env: Env<'_>) -> OllamaProvider {
    let mut config = OllamaConfigBuilder::new();
    if let Some(base_url) = env("OLLAMA_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    if let Some(model) = env("OLLAMA_MODEL") {
        config = config.with_model(model);
    }
    OllamaProvider::new(config.build())
}

/// Echoes streamed tokens to stderr, each line behind a gutter mark.
fn token_printer() -> impl Fn(&str) + Send + Sync + 'static {
    let first = AtomicBool::new(true);
    let colored = std::io::stderr().is_terminal();
    move |token| {
        let mut shown = token.replace('\n', &format!("\n{TOKEN_PREFIX} "));
        if first.swap(false, Ordering::Relaxed) {
            shown.insert_str(0, TOKEN_PREFIX);
        }
        let mut stderr = std::io::stderr().lock();
        // Display only; a broken stderr must not stop the agent.
        let _ = if colored {
            write!(stderr, "{}", shown.dimmed())
        } else {
            write!(stderr, "{shown}")
        };
        let _ = stderr.flush();
    }
}
