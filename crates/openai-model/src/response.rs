use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use lookout_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, ErrorBody, ToolCallDelta};

#[derive(Debug, Default)]
struct PartialToolCall {
    index: Option<u32>,
    id: String,
    name: String,
    arguments: String,
}

struct PartialState {
    sse: Sse,
    id: Option<String>,
    tool_calls: Vec<PartialToolCall>,
    finish_reason: Option<ModelFinishReason>,
    // Events decoded but not yet handed out. Text deltas are queued as soon
    // as they arrive, tool calls and the completion only after the stream
    // ends, since tool call arguments are not usable before that.
    pending: VecDeque<ModelResponseEvent>,
    finished: bool,
}

impl PartialState {
    fn apply_chunk(&mut self, data: &str) -> Result<(), Error> {
        let mut chunk = match serde_json::from_str::<ChatCompletionChunk>(data)
        {
            Ok(chunk) => chunk,
            Err(err) => {
                // Some servers report failures in-band after a 200.
                if let Ok(body) = serde_json::from_str::<ErrorBody>(data) {
                    return Err(Error::new(body.error.message, ErrorKind::Other));
                }
                return Err(Error::new(format!("{err}"), ErrorKind::Other));
            }
        };
        if self.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        }

        // Usage-only chunks carry no choices.
        let Some(choice) = chunk.choices.pop() else {
            return Ok(());
        };

        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                self.pending
                    .push_back(ModelResponseEvent::MessageDelta(content));
            }
        }
        for delta in choice.delta.tool_calls.unwrap_or_default() {
            self.merge_tool_call(delta);
        }
        if let Some(finish_reason) = choice.finish_reason {
            self.finish_reason = Some(if finish_reason == "tool_calls" {
                ModelFinishReason::ToolCalls
            } else {
                ModelFinishReason::Stop
            });
        }
        Ok(())
    }

    fn merge_tool_call(&mut self, delta: ToolCallDelta) {
        let position = match delta.index {
            Some(index) => {
                self.tool_calls.iter().position(|t| t.index == Some(index))
            }
            // Without an index, a fragment with an id starts a new call and
            // anything else continues the last one.
            None if delta.id.is_none() => self.tool_calls.len().checked_sub(1),
            None => None,
        };
        let position = position.unwrap_or_else(|| {
            self.tool_calls.push(PartialToolCall {
                index: delta.index,
                ..Default::default()
            });
            self.tool_calls.len() - 1
        });
        let partial = &mut self.tool_calls[position];

        if let Some(id) = delta.id {
            partial.id.push_str(&id);
        }
        if let Some(function) = delta.function {
            if let Some(name) = function.name {
                partial.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                partial.arguments.push_str(&arguments);
            }
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let has_tool_calls = !self.tool_calls.is_empty();
        for call in self.tool_calls.drain(..) {
            let req = ToolCallRequest::new(call.id, call.name, call.arguments);
            self.pending.push_back(ModelResponseEvent::ToolCall(req));
        }
        let finish_reason = self.finish_reason.unwrap_or(if has_tool_calls {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        });
        self.pending
            .push_back(ModelResponseEvent::Completed(finish_reason));
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A streamed chat completion from [`crate::OpenAIProvider`].
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            tool_calls: Default::default(),
            finish_reason: None,
            pending: Default::default(),
            finished: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        *this.next_event_fut = Some(Box::pin(next_event(partial_state)));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.finished {
            return Ok((None, partial_state));
        }

        let sse_event = partial_state.sse.next_event().await.map_err(|err| {
            Error::new(format!("{err}"), ErrorKind::Other)
        })?;
        match sse_event {
            Some(data) if data == "[DONE]" => partial_state.finish(),
            Some(data) => {
                trace!("got sse event: {data}");
                partial_state.apply_chunk(&data)?;
            }
            None => partial_state.finish(),
        }
    }
}
