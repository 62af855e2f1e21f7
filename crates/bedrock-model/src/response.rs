use std::pin::Pin;
use std::task::{Context, Poll, ready};

use ask_agent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::EventStream;
use crate::proto::{self, ErrorBody};

struct PartialState {
    events: EventStream,
    pending_finish_reason: Option<ModelFinishReason>,
    done: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct BedrockResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl BedrockResponse {
    #[inline]
    pub fn from_event_stream(events: EventStream) -> Self {
        let partial_state = PartialState {
            events,
            pending_finish_reason: None,
            done: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
        }
    }
}

impl ModelResponse for BedrockResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        match ready!(next_event_fut.as_mut().poll(cx)) {
            Ok((Some(event), partial_state)) => {
                *this.next_event_fut =
                    Some(Box::pin(next_event(partial_state)));
                Poll::Ready(Ok(Some(event)))
            }
            Ok((None, _)) => {
                *this.next_event_fut = None;
                Poll::Ready(Ok(None))
            }
            Err(err) => {
                *this.next_event_fut = None;
                Poll::Ready(Err(err))
            }
        }
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    if let Some(reason) = partial_state.pending_finish_reason.take() {
        return Ok((Some(ModelResponseEvent::Completed(reason)), partial_state));
    }

    while !partial_state.done {
        let frame = match partial_state.events.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got event frame: {:?}", frame.headers);

        match frame.header(":message-type") {
            Some("event") => {}
            Some("exception") | Some("error") => {
                let exception = frame
                    .header(":exception-type")
                    .or_else(|| frame.header(":error-code"))
                    .unwrap_or("UnknownException")
                    .to_owned();
                let message = serde_json::from_slice::<ErrorBody>(&frame.payload)
                    .map(|body| body.message)
                    .unwrap_or_else(|_| {
                        String::from_utf8_lossy(&frame.payload).into_owned()
                    });
                let kind = if exception == "throttlingException" {
                    ErrorKind::RateLimitExceeded
                } else {
                    ErrorKind::Other
                };
                return Err(Error::new(format!("{exception}: {message}"), kind));
            }
            other => {
                debug!("ignoring frame with message type {other:?}");
                continue;
            }
        }
        if frame.header(":event-type") != Some("chunk") {
            continue;
        }

        let chunk = proto::decode_chunk(&frame.payload)
            .map_err(|err| Error::new(err, ErrorKind::Other))?;
        if let Some(stop_reason) = chunk.stop_reason {
            partial_state.done = true;
            partial_state.pending_finish_reason = Some(
                if stop_reason == "max_tokens" {
                    ModelFinishReason::Length
                } else {
                    ModelFinishReason::Stop
                },
            );
        }
        if !chunk.completion.is_empty() {
            return Ok((
                Some(ModelResponseEvent::TextDelta(chunk.completion)),
                partial_state,
            ));
        }
        if let Some(reason) = partial_state.pending_finish_reason.take() {
            return Ok((
                Some(ModelResponseEvent::Completed(reason)),
                partial_state,
            ));
        }
    }

    partial_state.done = true;
    Ok((None, partial_state))
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;

    use super::*;
    use crate::io::Chunks;
    use crate::io::event_stream_tests::encode_frame;

    fn chunk_frame(completion: &str, stop_reason: Option<&str>) -> Vec<u8> {
        let inner = serde_json::json!({
            "completion": completion,
            "stop_reason": stop_reason,
        });
        let payload = serde_json::json!({
            "bytes": STANDARD.encode(inner.to_string()),
        });
        encode_frame(
            &[
                (":message-type", "event"),
                (":event-type", "chunk"),
                (":content-type", "application/json"),
            ],
            payload.to_string().as_bytes(),
        )
    }

    async fn collect(
        body: Vec<u8>,
    ) -> Result<(String, Vec<ModelFinishReason>), Error> {
        let chunks = Chunks::from_vec_deque(vec![Bytes::from(body)].into());
        let mut resp =
            pin!(BedrockResponse::from_event_stream(EventStream::new(chunks)));
        let mut text = String::new();
        let mut reasons = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            match event {
                ModelResponseEvent::TextDelta(delta) => text.push_str(&delta),
                ModelResponseEvent::Completed(reason) => reasons.push(reason),
            }
        }
        Ok((text, reasons))
    }

    #[tokio::test]
    async fn test_stream() {
        let mut body = chunk_frame(" Thought: Do I need to use a tool? No\n", None);
        body.extend(chunk_frame("Final Answer: Bob", Some("stop_sequence")));
        let (text, reasons) = collect(body).await.unwrap();
        assert_eq!(text, " Thought: Do I need to use a tool? No\nFinal Answer: Bob");
        assert_eq!(reasons, vec![ModelFinishReason::Stop]);
    }

    #[tokio::test]
    async fn test_exception() {
        let body = encode_frame(
            &[
                (":message-type", "exception"),
                (":exception-type", "throttlingException"),
            ],
            br#"{"message":"Too many requests"}"#,
        );
        let err = collect(body).await.unwrap_err();
        assert_eq!(err.message(), "throttlingException: Too many requests");
        assert_eq!(
            ask_agent_model::ModelProviderError::kind(&err),
            ErrorKind::RateLimitExceeded
        );
    }
}
