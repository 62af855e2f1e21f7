use std::future::ready;
use std::sync::{Arc, Mutex};

use ask_agent::SessionBuilder;
use ask_agent::core::tool::{Tool, ToolResult};
use ask_agent_test_model::TestModelProvider;

#[derive(Clone, Default)]
struct RecordingSearch {
    queries: Arc<Mutex<Vec<String>>>,
}

impl Tool for RecordingSearch {
    fn name(&self) -> &str {
        "Search"
    }

    fn description(&self) -> &str {
        "Search engine to answer questions about current events"
    }

    fn execute(
        &self,
        input: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        self.queries.lock().unwrap().push(input);
        ready(Ok(
            "The current population of Canada is 40,097,761 as of today."
                .to_owned(),
        ))
    }
}

#[tokio::test]
async fn answers_from_chat_history() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history.txt");
    std::fs::write(
        &history,
        "Human: Hi! My name is Bob\nAI: Hello Bob! Nice to meet you\n",
    )
    .unwrap();

    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_step(
        "Thought: Do I need to use a tool? No\nFinal Answer: Your name is Bob.",
    );
    let search = RecordingSearch::default();

    let session = SessionBuilder::with_model_provider(model_provider.clone())
        .with_history_path(&history)
        .with_search(false)
        .with_tool(search.clone())
        .build()
        .unwrap();
    let answer = session.ask("Who am I?").await.unwrap();

    assert_eq!(answer.output(), "Your name is Bob.");
    assert_eq!(answer.outcome.iterations, 1);
    assert!(search.queries.lock().unwrap().is_empty());

    let prompt = &model_provider.requests()[0].prompt;
    assert!(prompt.contains("Human: Hi! My name is Bob\nAI: Hello Bob! Nice to meet you"));
    assert!(prompt.contains("New input: Who am I?"));

    assert_eq!(
        std::fs::read_to_string(&history).unwrap(),
        "Human: Hi! My name is Bob\nAI: Hello Bob! Nice to meet you\nHuman: Who am I?\nAssistant: Your name is Bob.\n"
    );
}

#[tokio::test]
async fn searches_then_answers() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history.txt");

    let mut model_provider = TestModelProvider::default();
    model_provider.add_text_step(
        "Thought: Do I need to use a tool? Yes\nAction: Search\nAction Input: current population of Canada",
    );
    model_provider.add_text_step(
        "Do I need to use a tool? No\nFinal Answer: About 40.1 million people live in Canada right now.",
    );
    let search = RecordingSearch::default();

    let session = SessionBuilder::with_model_provider(model_provider.clone())
        .with_history_path(&history)
        .with_search(false)
        .with_tool(search.clone())
        .build()
        .unwrap();
    let answer = session
        .ask("How many people live in Canada right now?")
        .await
        .unwrap();

    assert_eq!(
        answer.output(),
        "About 40.1 million people live in Canada right now."
    );
    assert_eq!(
        *search.queries.lock().unwrap(),
        vec!["current population of Canada"]
    );
    assert_eq!(answer.outcome.steps.len(), 1);

    let requests = model_provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].prompt.ends_with(
        "Action Input: current population of Canada\nObservation: The current population of Canada is 40,097,761 as of today.\nThought: "
    ));
}
