use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use ask_agent_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes the prompt word by word, honoring the first stop sequence.
#[derive(Debug)]
struct FakeModelResponse {
    fake_items: VecDeque<String>,
    completed: bool,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl FakeModelResponse {
    fn new(req: &ModelRequest) -> Self {
        let mut text = format!("You said {}", req.prompt);
        if let Some(idx) = req.stop.iter().filter_map(|s| text.find(s)).min()
        {
            text.truncate(idx);
        }
        let fake_items = text.split(' ').map(ToString::to_string).collect();
        Self {
            fake_items,
            completed: false,
            sleep: None,
        }
    }
}

impl ModelResponse for FakeModelResponse {
    type Error = FakeModelProviderError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            if let Some(mut this_item) = this.fake_items.pop_front() {
                let need_space = !this.fake_items.is_empty();
                if need_space {
                    this_item.push(' ');
                }
                return Poll::Ready(Ok(Some(ModelResponseEvent::TextDelta(
                    this_item,
                ))));
            }

            if !this.completed {
                this.completed = true;
                return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                    ModelFinishReason::Stop,
                ))));
            }

            return Poll::Ready(Ok(None));
        }
        this.sleep = Some(Box::pin(sleep(Duration::from_millis(1))));
        Pin::new(this).poll_next_event(cx)
    }
}

struct FakeModelProvider;

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;
    type Response = FakeModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = if req.prompt.is_empty() {
            Err(FakeModelProviderError(ErrorKind::Other))
        } else {
            Ok(FakeModelResponse::new(req))
        };
        ready(result)
    }
}

mod tests {
    use std::future::poll_fn;

    use super::*;

    async fn collect(resp: &mut FakeModelResponse) -> (String, bool) {
        let mut resp_message = String::new();
        let mut completed = false;
        loop {
            let resp_fut = poll_fn(|cx| Pin::new(&mut *resp).poll_next_event(cx));
            match resp_fut.await {
                Ok(Some(ModelResponseEvent::TextDelta(delta))) => {
                    resp_message.push_str(&delta);
                }
                Ok(Some(ModelResponseEvent::Completed(reason))) => {
                    assert_eq!(reason, ModelFinishReason::Stop);
                    completed = true;
                }
                Ok(None) => break,
                Err(err) => unreachable!("unexpected error: {err:?}"),
            }
        }
        (resp_message, completed)
    }

    #[tokio::test]
    async fn test_completion() {
        let provider = FakeModelProvider;
        let req = ModelRequest::new("Good morning");
        let mut resp = provider.send_request(&req).await.unwrap();

        let (message, completed) = collect(&mut resp).await;
        assert_eq!(message, "You said Good morning");
        assert!(completed);
    }

    #[tokio::test]
    async fn test_stop_sequence() {
        let provider = FakeModelProvider;
        let req = ModelRequest::new("Thought: hmm\nObservation: nope")
            .with_stop("\nObservation");
        let mut resp = provider.send_request(&req).await.unwrap();

        let (message, _) = collect(&mut resp).await;
        assert_eq!(message, "You said Thought: hmm");
    }

    #[tokio::test]
    async fn test_error() {
        let provider = FakeModelProvider;
        let req = ModelRequest::new("");
        let result = provider.send_request(&req).await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
