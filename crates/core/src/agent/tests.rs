use std::future::ready;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lookout_model::{ErrorKind, ModelMessage};
use lookout_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::tool::{Error as ToolError, Tool, ToolResult};
use crate::{AgentBuilder, Error, ITERATION_LIMIT_ANSWER};

#[derive(Deserialize)]
struct LookupInput {
    query: String,
}

/// Answers every lookup with a canned sentence, or fails for "offline".
struct FakeLookup {
    schema: Value,
}

impl FakeLookup {
    fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
        }
    }
}

impl Tool for FakeLookup {
    type Input = LookupInput;

    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Looks things up"
    }

    fn parameter_schema(&self) -> &Value {
        &self.schema
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let result = if input.query == "offline" {
            Err(ToolError::execution_error().with_reason("network unreachable"))
        } else {
            Ok(format!("Page: {0}\nSummary: {0} is a city.", input.query))
        };
        ready(result)
    }
}

fn tool_message(request: &lookout_model::ModelRequest) -> Option<&str> {
    request.messages.iter().find_map(|msg| match msg {
        ModelMessage::Tool(result) => Some(result.content.as_str()),
        _ => None,
    })
}

#[tokio::test]
async fn test_text_answer() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::MessageDelta("Hi, ".to_owned()),
        PresetEvent::MessageDelta("what can I do for you?".to_owned()),
    ]));

    let deltas = Arc::new(Mutex::new(String::new()));
    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(FakeLookup::new())
        .on_transcript({
            let deltas = Arc::clone(&deltas);
            move |delta| deltas.lock().unwrap().push_str(delta)
        })
        .build();

    let answer = agent.run("Hello").await.unwrap();
    assert_eq!(answer, "Hi, what can I do for you?");
    assert_eq!(*deltas.lock().unwrap(), answer);

    let requests = model_provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].tools[0].name, "wikipedia");
}

#[tokio::test(start_paused = true)]
async fn test_slow_stream() {
    let mut model_provider = TestModelProvider::default();
    model_provider.set_delay(Duration::from_secs(1));
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::MessageDelta("Paris".to_owned()),
        PresetEvent::MessageDelta(".".to_owned()),
    ]));

    let deltas = Arc::new(Mutex::new(Vec::new()));
    let agent = AgentBuilder::with_model_provider(model_provider)
        .on_transcript({
            let deltas = Arc::clone(&deltas);
            move |delta| deltas.lock().unwrap().push(delta.to_owned())
        })
        .build();

    let started = tokio::time::Instant::now();
    assert_eq!(agent.run("Capital of France?").await.unwrap(), "Paris.");
    // One delay per delta and one for the completion.
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(*deltas.lock().unwrap(), vec!["Paris", "."]);
}

#[tokio::test]
async fn test_system_prompt_comes_first() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_input_step();
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_text("Ok."));

    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_system_prompt("Answer briefly.")
        .build();
    agent.run("Hello").await.unwrap();

    let requests = model_provider.requests();
    let request = &requests[0];
    assert_eq!(
        request.messages,
        vec![
            ModelMessage::System("Answer briefly.".to_owned()),
            ModelMessage::User("Hello".to_owned()),
        ]
    );
}

#[tokio::test]
async fn test_tool_round_trip() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::tool_call("call:1", "wikipedia", r#"{"query":"Paris"}"#),
    ]));
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_text(
        "Paris.",
    ));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(FakeLookup::new())
        .on_tool_call({
            let seen = Arc::clone(&seen);
            move |req| seen.lock().unwrap().push(req.name.clone())
        })
        .build();

    let answer = agent.run("What is the capital of France?").await.unwrap();
    assert_eq!(answer, "Paris.");
    assert_eq!(*seen.lock().unwrap(), vec!["wikipedia".to_owned()]);

    let requests = model_provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        tool_message(&requests[1]),
        Some("Page: Paris\nSummary: Paris is a city.")
    );
}

#[tokio::test]
async fn test_tool_failure_is_reported_to_model() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::tool_call("call:1", "wikipedia", r#"{"query":"offline"}"#),
    ]));
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_text(
        "I could not reach Wikipedia.",
    ));

    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(FakeLookup::new())
        .build();

    let answer = agent.run("Look up offline").await.unwrap();
    assert_eq!(answer, "I could not reach Wikipedia.");
    assert_eq!(
        tool_message(&model_provider.requests()[1]),
        Some("Error: network unreachable")
    );
}

#[tokio::test]
async fn test_tolerates_malformed_arguments() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::tool_call("call:1", "wikipedia", r#"{"query": Paris"#),
    ]));
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::tool_call("call:2", "wikipedia", r#"{"query":"Paris"}"#),
    ]));
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_text(
        "Paris.",
    ));

    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(FakeLookup::new())
        .build();

    assert_eq!(agent.run("Capital of France?").await.unwrap(), "Paris.");
    let requests = model_provider.requests();
    let feedback = tool_message(&requests[1]).unwrap();
    assert!(feedback.starts_with("Error: "), "{feedback}");
}

#[tokio::test]
async fn test_rejects_malformed_arguments() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::tool_call("call:1", "wikipedia", "query=Paris"),
    ]));

    let agent = AgentBuilder::with_model_provider(model_provider)
        .with_tool(FakeLookup::new())
        .tolerate_parsing_errors(false)
        .build();

    let err = agent.run("Capital of France?").await.unwrap_err();
    assert!(
        matches!(&err, Error::MalformedToolCall { name, .. } if name == "wikipedia"),
        "{err}"
    );
}

#[tokio::test]
async fn test_unknown_tool_is_reported_even_when_strict() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        PresetEvent::tool_call("call:1", "calculator", r#"{"expr":"1+1"}"#),
    ]));
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_text("2"));

    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(FakeLookup::new())
        .tolerate_parsing_errors(false)
        .build();

    assert_eq!(agent.run("1+1?").await.unwrap(), "2");
    assert_eq!(
        tool_message(&model_provider.requests()[1]),
        Some("Error: `calculator` is not a valid tool, try one of [wikipedia]")
    );
}

#[tokio::test]
async fn test_iteration_limit() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_input_step();
    for idx in 0..2 {
        model_provider.add_assistant_response_step(
            PresetResponse::with_events([PresetEvent::tool_call(
                &format!("call:{idx}"),
                "wikipedia",
                r#"{"query":"Paris"}"#,
            )]),
        );
        model_provider.add_input_step();
    }

    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_tool(FakeLookup::new())
        .with_max_iterations(2)
        .build();

    assert_eq!(agent.run("Loop forever").await.unwrap(), ITERATION_LIMIT_ANSWER);
    assert_eq!(model_provider.requests().len(), 2);
}

#[tokio::test]
async fn test_provider_error() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_input_step();
    model_provider.add_assistant_response_step(
        PresetResponse::with_text("never").with_failures(0),
    );

    let agent = AgentBuilder::with_model_provider(model_provider).build();
    let err = agent.run("Hello").await.unwrap_err();
    assert_eq!(err.provider_error_kind(), Some(ErrorKind::RateLimitExceeded));
}
