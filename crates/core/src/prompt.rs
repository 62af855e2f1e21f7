use crate::Error;

/// The ReAct instruction skeleton used when no custom template is given.
pub const DEFAULT_TEMPLATE: &str = "\
You are a helpful assistant.
You have access to the following tools:
{tools}
To use a tool, please use the following format:
```
Thought: Do I need to use a tool? Yes
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
```
When you have a response to say to the Human, or if you do not need to use a tool, you MUST use the format:
```
Thought: Do I need to use a tool? No
Final Answer: [your response here]
```
Begin!
Previous conversation history:
{chat_history}
New input: {input}
{agent_scratchpad}";

const VARIABLES: [&str; 5] = [
    "tools",
    "tool_names",
    "chat_history",
    "input",
    "agent_scratchpad",
];

/// Values substituted into a [`PromptTemplate`].
#[derive(Clone, Copy, Debug, Default)]
pub struct PromptVars<'a> {
    /// One `name: description` line per tool.
    pub tools: &'a str,
    /// Tool names joined by `", "`.
    pub tool_names: &'a str,
    /// Prior transcript text.
    pub chat_history: &'a str,
    /// The new human input.
    pub input: &'a str,
    /// Rendered scratchpad of the current invocation.
    pub agent_scratchpad: &'a str,
}

impl PromptVars<'_> {
    fn get(&self, name: &str) -> Option<&str> {
        match name {
            "tools" => Some(self.tools),
            "tool_names" => Some(self.tool_names),
            "chat_history" => Some(self.chat_history),
            "input" => Some(self.input),
            "agent_scratchpad" => Some(self.agent_scratchpad),
            _ => None,
        }
    }
}

/// An instruction text with named `{placeholder}` fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// Creates a template, checking that every placeholder is present.
    pub fn new<S: Into<String>>(text: S) -> Result<Self, Error> {
        let text = text.into();
        for name in VARIABLES {
            if !text.contains(&format!("{{{name}}}")) {
                return Err(Error::MissingVariable(name));
            }
        }
        Ok(Self { text })
    }

    /// Returns the raw template text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitutes all placeholders in one pass.
    ///
    /// Substituted values are never scanned again, and braces that do not
    /// enclose a known name are copied as is.
    pub fn render(&self, vars: &PromptVars<'_>) -> String {
        let mut out = String::with_capacity(self.text.len() + 256);
        let mut rest = self.text.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let value = after
                .find('}')
                .and_then(|close| Some((close, vars.get(&after[..close])?)));
            match value {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    #[inline]
    fn default() -> Self {
        Self {
            text: DEFAULT_TEMPLATE.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(
            PromptTemplate::new(DEFAULT_TEMPLATE).unwrap(),
            PromptTemplate::default()
        );
    }

    #[test]
    fn test_missing_variable() {
        let err = PromptTemplate::new("{tools} {tool_names} {input}")
            .unwrap_err();
        assert!(matches!(err, Error::MissingVariable("chat_history")));
    }

    #[test]
    fn test_render() {
        let template = PromptTemplate::default();
        let prompt = template.render(&PromptVars {
            tools: "Search: Search engine",
            tool_names: "Search",
            chat_history: "Human: Hi! My name is Bob\nAI: Hello Bob! Nice to meet you",
            input: "Who am I?",
            agent_scratchpad: "",
        });
        assert!(prompt.starts_with(
            "You are a helpful assistant.\nYou have access to the following tools:\nSearch: Search engine\n"
        ));
        assert!(prompt.contains("should be one of [Search]\n"));
        assert!(prompt.ends_with(
            "Previous conversation history:\nHuman: Hi! My name is Bob\nAI: Hello Bob! Nice to meet you\nNew input: Who am I?\n"
        ));
    }

    #[test]
    fn test_single_pass() {
        let template = PromptTemplate::new(
            "{tools}|{tool_names}|{chat_history}|{input}|{agent_scratchpad}|{other}|{",
        )
        .unwrap();
        let prompt = template.render(&PromptVars {
            input: "what is {tools}?",
            tools: "T",
            ..Default::default()
        });
        assert_eq!(prompt, "T|||what is {tools}?||{other}|{");
    }
}
