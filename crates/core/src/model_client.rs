use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use lookout_model::{
    AssistantMessage, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

type DeltaSink = Box<dyn Fn(String) + Send + 'static>;
type CompletionResult = Result<Completion, Box<dyn ModelProviderError>>;
type CompletionFuture = Pin<Box<dyn Future<Output = CompletionResult> + Send>>;

/// A model answer drained to the end of its stream.
#[derive(Clone, Debug)]
pub struct Completion {
    /// Everything the model said, ready to be replayed as history.
    pub message: AssistantMessage,
    /// `None` when the stream ended without a completion event.
    pub finish_reason: Option<ModelFinishReason>,
}

/// Object-safe view of a [`ModelProvider`].
trait CompletionProvider: Send + Sync {
    fn complete(
        &self,
        req: ModelRequest,
        on_delta: DeltaSink,
    ) -> CompletionFuture;
}

impl<P: ModelProvider + 'static> CompletionProvider for P {
    fn complete(
        &self,
        req: ModelRequest,
        on_delta: DeltaSink,
    ) -> CompletionFuture {
        let fut = self.send_request(&req);
        let span =
            trace_span!("model client req", messages = req.messages.len());
        Box::pin(
            async move {
                let resp = fut.await.map_err(boxed)?;
                drain(resp, on_delta).await
            }
            .instrument(span),
        )
    }
}

/// A cheaply cloneable handle to the model provider, hiding its concrete
/// type from the agent.
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn CompletionProvider>,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    /// Samples the model and waits for the whole answer.
    ///
    /// `on_delta` receives answer text as it streams in. Dropping the
    /// returned future stops reading the stream.
    #[inline]
    pub async fn complete(
        &self,
        req: ModelRequest,
        on_delta: impl Fn(String) + Send + 'static,
    ) -> CompletionResult {
        self.provider.complete(req, Box::new(on_delta)).await
    }
}

fn boxed<E: ModelProviderError>(err: E) -> Box<dyn ModelProviderError> {
    error!("model provider failed: {err} ({})", err.kind());
    Box::new(err)
}

async fn drain<R: ModelResponse>(
    resp: R,
    on_delta: DeltaSink,
) -> CompletionResult {
    let mut message = AssistantMessage::default();
    let mut finish_reason = None;

    let mut resp = pin!(resp);
    while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
        .await
        .map_err(boxed)?
    {
        trace!("got an event: {event:?}");
        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                message.content.push_str(&delta);
                on_delta(delta);
            }
            ModelResponseEvent::ToolCall(req) => {
                debug!("model called `{}` ({})", req.name, req.id);
                message.tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    if finish_reason == Some(ModelFinishReason::ToolCalls)
        && !message.has_tool_calls()
    {
        warn!("model stopped for tool calls but sent none");
    }
    Ok(Completion {
        message,
        finish_reason,
    })
}
