//! Parser for the ReAct textual protocol.
//!
//! A completion either asks for a tool:
//!
//! ```text
//! Thought: Do I need to use a tool? Yes
//! Action: Search
//! Action Input: population of Canada
//! ```
//!
//! or ends the invocation:
//!
//! ```text
//! Thought: Do I need to use a tool? No
//! Final Answer: There are about 40 million people.
//! ```

use std::sync::LazyLock;

use regex::Regex;

const FINAL_ANSWER: &str = "Final Answer:";

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)",
    )
    .unwrap()
});
static ACTION_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action\s*\d*\s*:").unwrap());

/// A request to call a tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentAction {
    /// Reasoning text before the action.
    pub thought: String,
    /// Tool name.
    pub tool: String,
    /// Free text passed to the tool.
    pub tool_input: String,
    /// The whole completion.
    pub log: String,
}

/// The final answer of an invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentFinish {
    /// Reasoning text before the answer.
    pub thought: String,
    /// The answer text.
    pub output: String,
    /// The whole completion.
    pub log: String,
}

/// The transition a completion asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedOutput {
    /// Call a tool, then think again.
    Action(AgentAction),
    /// Stop with an answer.
    Finish(AgentFinish),
}

/// Why a completion could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseFailure {
    /// Short description of what was missing.
    pub reason: &'static str,
}

impl ParseFailure {
    /// No `Action:` line was found.
    pub const MISSING_ACTION: &'static str = "Missing 'Action:' after 'Thought:'";
    /// An `Action:` line was found but no `Action Input:` after it.
    pub const MISSING_ACTION_INPUT: &'static str =
        "Missing 'Action Input:' after 'Action:'";
}

/// Parses a model completion.
///
/// The first action and the first final answer are located; whichever
/// starts earlier in the text decides the result.
pub fn parse(text: &str) -> Result<ParsedOutput, ParseFailure> {
    let action = ACTION_RE.captures(text);
    let final_idx = text.find(FINAL_ANSWER);

    let action_first = match (&action, final_idx) {
        (Some(caps), Some(idx)) => caps.get(0).is_some_and(|m| m.start() < idx),
        (Some(_), None) => true,
        (None, _) => false,
    };

    if let Some(caps) = action.filter(|_| action_first) {
        let start = caps.get(0).map_or(0, |m| m.start());
        let tool = caps.get(1).map_or("", |m| m.as_str()).trim();
        let tool_input = caps.get(2).map_or("", |m| m.as_str());
        return Ok(ParsedOutput::Action(AgentAction {
            thought: thought(&text[..start]),
            tool: tool.to_owned(),
            tool_input: clean_input(tool_input),
            log: text.to_owned(),
        }));
    }

    if let Some(idx) = final_idx {
        let output = text[idx + FINAL_ANSWER.len()..].trim();
        return Ok(ParsedOutput::Finish(AgentFinish {
            thought: thought(&text[..idx]),
            output: output.to_owned(),
            log: text.to_owned(),
        }));
    }

    if !ACTION_ONLY_RE.is_match(text) {
        Err(ParseFailure {
            reason: ParseFailure::MISSING_ACTION,
        })
    } else {
        Err(ParseFailure {
            reason: ParseFailure::MISSING_ACTION_INPUT,
        })
    }
}

fn thought(prefix: &str) -> String {
    let prefix = prefix.trim();
    prefix
        .strip_prefix("Thought:")
        .unwrap_or(prefix)
        .trim()
        .to_owned()
}

/// Cuts the input at the first hallucinated observation or final answer.
fn clean_input(raw: &str) -> String {
    let end = ["\nObservation", FINAL_ANSWER]
        .iter()
        .filter_map(|marker| raw.find(marker))
        .min()
        .unwrap_or(raw.len());
    raw[..end].trim().trim_matches('"').to_owned()
}
