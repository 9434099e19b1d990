use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;
use crate::tool_call::ToolCallRequest;

/// A model answer that arrives as a stream of events.
///
/// This is a poll-based trait so that providers can expose their
/// streaming body without boxing; callers usually drive it with
/// [`poll_fn`](std::future::poll_fn).
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Polls for the next event.
    ///
    /// Returns `Ready(Ok(Some(_)))` for each event, `Ready(Ok(None))` once
    /// the stream is over (and on every call after that), and
    /// `Ready(Err(_))` when the stream broke. `Pending` registers the
    /// waker of `cx` as usual.
    ///
    /// Tool call events must carry complete arguments, so implementations
    /// that receive tool calls in fragments have to buffer them.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// Why the model stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// It is waiting for the results of its tool calls.
    ToolCalls,
    /// It considers its answer complete.
    Stop,
}

/// One item of a streamed model answer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The last event of a successful stream.
    Completed(ModelFinishReason),
    /// A piece of the answer text.
    MessageDelta(String),
    /// A fully received tool call.
    ToolCall(ToolCallRequest),
}
