use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use ask_agent_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

/// Display sink receiving each streamed text delta.
pub type TokenSink = Arc<dyn Fn(&str) + Send + Sync>;

type SendRequestResult = Result<Completion, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, Option<TokenSink>) -> BoxedSendRequestFuture
        + Send + Sync
>;

/// A wrapper around a model provider that provides a type-erased
/// interface for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_token| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_token).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and waits for the full completion.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_token: Option<TokenSink>,
    ) -> SendRequestResult {
        (self.handler_fn)(req, on_token).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    /// Concatenation of all text deltas, in generation order.
    pub text: String,
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_token: Option<TokenSink>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut text = String::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::TextDelta(delta) => {
                if let Some(on_token) = &on_token {
                    on_token(&delta);
                }
                text.push_str(&delta);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    if finish_reason == Some(ModelFinishReason::Length) {
        warn!("completion was cut off by the token limit");
    }

    Ok(Completion {
        text,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ask_agent_model::ErrorKind;
    use ask_agent_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        for _ in 0..3 {
            model_provider.add_response_step(PresetResponse::with_events([
                PresetEvent::TextDelta("Final ".to_owned()),
                PresetEvent::TextDelta("Answer: ".to_owned()),
                PresetEvent::TextDelta("Bob".to_owned()),
                PresetEvent::Completed(ModelFinishReason::Stop),
            ]));
        }

        let model_client = ModelClient::new(model_provider.clone());

        for _ in 0..3 {
            let tokens = Arc::new(Mutex::new(Vec::<String>::new()));
            let sink: TokenSink = {
                let tokens = Arc::clone(&tokens);
                Arc::new(move |token| {
                    tokens.lock().unwrap().push(token.to_owned())
                })
            };
            let resp = model_client
                .send_request(ModelRequest::new("Who am I?"), Some(sink))
                .await
                .unwrap();
            assert_eq!(resp.text, "Final Answer: Bob");
            assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
            assert_eq!(
                *tokens.lock().unwrap(),
                vec!["Final ", "Answer: ", "Bob"]
            );
        }
        assert_eq!(model_provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let err = model_client
            .send_request(ModelRequest::new("Hi"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
