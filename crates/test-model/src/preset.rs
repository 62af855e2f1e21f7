use ask_agent_model::ModelFinishReason;
use serde::{Deserialize, Serialize};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "text_delta")]
    TextDelta(String),
    #[serde(rename = "completed")]
    Completed(ModelFinishReason),
}

/// The preset response for one completion request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request will fail in the first `failure` attempts.
    /// `Some(0)` means the request will fail infinitely.
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
        }
    }

    /// Creates a `PresetResponse` that streams `text` in chunks of at most
    /// `chunk_len` characters, followed by a `Stop` completion event.
    pub fn with_text(text: &str, chunk_len: usize) -> Self {
        let chunk_len = chunk_len.max(1);
        let chars: Vec<char> = text.chars().collect();
        let mut events: Vec<PresetEvent> = chars
            .chunks(chunk_len)
            .map(|chunk| PresetEvent::TextDelta(chunk.iter().collect()))
            .collect();
        events.push(PresetEvent::Completed(ModelFinishReason::Stop));
        Self::with_events(events)
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let response = PresetResponse::with_events([
            PresetEvent::TextDelta("Thought: Do I need to use a tool? No\n".to_string()),
            PresetEvent::TextDelta("Final Answer: Hi".to_string()),
            PresetEvent::Completed(ModelFinishReason::Stop),
        ]);

        let serialized = serde_json::to_string(&response).unwrap();
        let deserialized: PresetResponse =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(response, deserialized);
    }

    #[test]
    fn test_with_text() {
        let response = PresetResponse::with_text("abcde", 2);
        assert_eq!(
            response.events,
            vec![
                PresetEvent::TextDelta("ab".to_owned()),
                PresetEvent::TextDelta("cd".to_owned()),
                PresetEvent::TextDelta("e".to_owned()),
                PresetEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }
}
