use std::pin::Pin;
use std::task::{Context, Poll, ready};

use ask_agent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::Lines;
use crate::proto::ChatResponseLine;

struct PartialState {
    lines: Lines,
    pending_finish_reason: Option<ModelFinishReason>,
    done: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OllamaResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OllamaResponse {
    #[inline]
    pub fn from_lines(lines: Lines) -> Self {
        let partial_state = PartialState {
            lines,
            pending_finish_reason: None,
            done: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
        }
    }
}

impl ModelResponse for OllamaResponse {
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
        let line = match partial_state.lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got ollama line: {line}");

        let line = serde_json::from_str::<ChatResponseLine>(&line)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if let Some(error) = line.error {
            return Err(Error::new(error, ErrorKind::Other));
        }

        if line.done {
            partial_state.done = true;
            partial_state.pending_finish_reason =
                Some(match line.done_reason.as_deref() {
                    Some("length") => ModelFinishReason::Length,
                    _ => ModelFinishReason::Stop,
                });
        }

        let content = line.message.map(|m| m.content).unwrap_or_default();
        if !content.is_empty() {
            return Ok((
                Some(ModelResponseEvent::TextDelta(content)),
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

    use bytes::Bytes;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        body: &'static [u8],
    ) -> Result<(String, Vec<ModelFinishReason>), Error> {
        let chunks = Chunks::from_vec_deque(vec![Bytes::from_static(body)].into());
        let mut resp = pin!(OllamaResponse::from_lines(Lines::new(chunks)));
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
        let (text, reasons) = collect(
            b"{\"message\":{\"role\":\"assistant\",\"content\":\"Final\"},\"done\":false}\n\
              {\"message\":{\"role\":\"assistant\",\"content\":\" Answer: Bob\"},\"done\":false}\n\
              {\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"done_reason\":\"stop\"}\n",
        )
        .await
        .unwrap();
        assert_eq!(text, "Final Answer: Bob");
        assert_eq!(reasons, vec![ModelFinishReason::Stop]);
    }

    #[tokio::test]
    async fn test_error_line() {
        let err = collect(b"{\"error\":\"model 'mistral' not found\"}\n")
            .await
            .unwrap_err();
        assert_eq!(err.message(), "model 'mistral' not found");
    }
}
