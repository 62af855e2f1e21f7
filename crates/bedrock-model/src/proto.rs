use ask_agent_model::ModelRequest;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::BedrockConfig;

const HUMAN_PROMPT: &str = "\n\nHuman:";
const AI_PROMPT: &str = "\n\nAssistant:";

// ------------------------
// Types sent to the server
// ------------------------

/// Anthropic text-completion body, as accepted by Claude v2 on Bedrock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    prompt: String,
    max_tokens_to_sample: u32,
    stop_sequences: Vec<String>,
}

pub fn create_request(
    req: &ModelRequest,
    config: &BedrockConfig,
) -> CompletionRequest {
    let mut stop_sequences = vec![HUMAN_PROMPT.to_owned()];
    stop_sequences.extend(req.stop.iter().cloned());
    CompletionRequest {
        prompt: format!("{HUMAN_PROMPT} {}{AI_PROMPT}", req.prompt),
        max_tokens_to_sample: config.max_tokens,
        stop_sequences,
    }
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PayloadPart {
    pub bytes: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub completion: String,
    pub stop_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(alias = "Message")]
    pub message: String,
}

/// Decodes the payload of a `chunk` event.
pub fn decode_chunk(payload: &[u8]) -> Result<CompletionChunk, String> {
    let part: PayloadPart =
        serde_json::from_slice(payload).map_err(|err| format!("{err}"))?;
    let bytes = STANDARD
        .decode(part.bytes.as_bytes())
        .map_err(|err| format!("{err}"))?;
    serde_json::from_slice(&bytes).map_err(|err| format!("{err}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{BedrockConfigBuilder, Credentials};

    #[test]
    fn test_create_request() {
        let config = BedrockConfigBuilder::with_credentials(Credentials::new(
            "AKID", "secret",
        ))
        .build();
        let req = ModelRequest::new("Who am I?").with_stop("\nObservation");
        let value =
            serde_json::to_value(create_request(&req, &config)).unwrap();
        assert_eq!(
            value,
            json!({
                "prompt": "\n\nHuman: Who am I?\n\nAssistant:",
                "max_tokens_to_sample": 1024,
                "stop_sequences": ["\n\nHuman:", "\nObservation"],
            })
        );
    }

    #[test]
    fn test_decode_chunk() {
        let inner = r#"{"completion":" Final Answer: Bob","stop_reason":null}"#;
        let payload =
            format!(r#"{{"bytes":"{}"}}"#, STANDARD.encode(inner.as_bytes()));
        let chunk = decode_chunk(payload.as_bytes()).unwrap();
        assert_eq!(chunk.completion, " Final Answer: Bob");
        assert_eq!(chunk.stop_reason, None);

        assert!(decode_chunk(br#"{"bytes":"!!"}"#).is_err());
    }
}
