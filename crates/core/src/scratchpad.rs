/// One completed thought/action/observation round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentStep {
    /// Reasoning text before the action.
    pub thought: String,
    /// Tool name as requested by the model.
    pub action: String,
    /// Text passed to the tool.
    pub action_input: String,
    /// Tool result, or a corrective message.
    pub observation: String,
    /// The raw completion that produced this step.
    pub log: String,
}

/// Renders the steps so the model can continue where it stopped.
pub(crate) fn render(steps: &[AgentStep]) -> String {
    let mut out = String::new();
    for step in steps {
        out.push_str(&step.log);
        out.push_str("\nObservation: ");
        out.push_str(&step.observation);
        out.push_str("\nThought: ");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        assert_eq!(render(&[]), "");

        let step = AgentStep {
            thought: "Do I need to use a tool? Yes".to_owned(),
            action: "Search".to_owned(),
            action_input: "population of Canada".to_owned(),
            observation: "40 million".to_owned(),
            log: "Thought: Do I need to use a tool? Yes\nAction: Search\nAction Input: population of Canada".to_owned(),
        };
        assert_eq!(
            render(&[step]),
            "Thought: Do I need to use a tool? Yes\nAction: Search\nAction Input: population of Canada\nObservation: 40 million\nThought: "
        );
    }
}
