use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use lookout_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes the question word by word, or asks for a lookup when the question
/// starts with `lookup `.
#[derive(Debug)]
struct FakeModelResponse {
    events: VecDeque<ModelResponseEvent>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl FakeModelResponse {
    fn new(input: &str) -> Self {
        let mut events = VecDeque::new();
        if let Some(query) = input.strip_prefix("lookup ") {
            events.push_back(ModelResponseEvent::ToolCall(ToolCallRequest {
                id: "call:0".to_owned(),
                name: "wikipedia".to_owned(),
                arguments: format!(r#"{{"query":"{query}"}}"#),
            }));
            events.push_back(ModelResponseEvent::Completed(
                ModelFinishReason::ToolCalls,
            ));
        } else {
            let words: Vec<_> = format!("You asked {input}")
                .split(' ')
                .map(ToString::to_string)
                .collect();
            let count = words.len();
            for (idx, mut word) in words.into_iter().enumerate() {
                if idx + 1 < count {
                    word.push(' ');
                }
                events.push_back(ModelResponseEvent::MessageDelta(word));
            }
            events.push_back(ModelResponseEvent::Completed(
                ModelFinishReason::Stop,
            ));
        }
        Self {
            events,
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
        let this = self.get_mut();
        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(Duration::from_millis(1))));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;
        Poll::Ready(Ok(this.events.pop_front()))
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
        let question = req.messages.iter().rev().find_map(|msg| match msg {
            ModelMessage::User(text) => Some(text.as_str()),
            _ => None,
        });
        let result = match question {
            Some(question) => Ok(FakeModelResponse::new(question)),
            None => Err(FakeModelProviderError(ErrorKind::Other)),
        };
        ready(result)
    }
}

async fn collect_events(mut resp: FakeModelResponse) -> Vec<ModelResponseEvent> {
    let mut events = vec![];
    while let Some(event) =
        std::future::poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
            .await
            .unwrap()
    {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_text_completion() {
    let provider = FakeModelProvider;
    let req = ModelRequest {
        messages: vec![ModelMessage::User("about Paris".to_string())],
        tools: vec![],
    };
    let resp = provider.send_request(&req).await.unwrap();

    let mut text = String::new();
    let mut finish_reason = None;
    for event in collect_events(resp).await {
        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::Completed(reason) => finish_reason = Some(reason),
            ModelResponseEvent::ToolCall(req) => {
                unreachable!("unexpected tool call: {req:?}")
            }
        }
    }

    assert_eq!(text, "You asked about Paris");
    assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_tool_call_keeps_raw_arguments() {
    let provider = FakeModelProvider;
    let req = ModelRequest {
        messages: vec![
            ModelMessage::System("Be brief.".to_string()),
            ModelMessage::User("lookup Rust".to_string()),
        ],
        tools: vec![],
    };
    let resp = provider.send_request(&req).await.unwrap();
    let events = collect_events(resp).await;

    assert_eq!(
        events,
        vec![
            ModelResponseEvent::ToolCall(ToolCallRequest {
                id: "call:0".to_owned(),
                name: "wikipedia".to_owned(),
                arguments: r#"{"query":"Rust"}"#.to_owned(),
            }),
            ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
        ]
    );
}

#[tokio::test]
async fn test_error() {
    let provider = FakeModelProvider;
    let req = ModelRequest {
        messages: vec![],
        tools: vec![],
    };
    let err = provider.send_request(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert_eq!(err.to_string(), "provider error");
}
