use ask_agent_model::ModelRequest;
use serde::{Deserialize, Serialize};

use crate::OllamaConfig;

// ------------------------------
// Types received from the server
// ------------------------------

/// One line of a streamed `/api/chat` response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatResponseLine {
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub done: bool,
    pub done_reason: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: Options,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Options {
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[inline]
pub fn create_request(req: &ModelRequest, config: &OllamaConfig) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: vec![Message {
            role: "user",
            content: req.prompt.clone(),
        }],
        stream: true,
        options: Options {
            temperature: config.temperature,
            stop: req.stop.clone(),
        },
    }
}
