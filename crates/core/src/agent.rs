mod builder;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use futures_util::future::join_all;
use lookout_model::{ModelMessage, ToolCallRequest, ToolCallResult};

use crate::Error;
use crate::conversation::Conversation;
use crate::model_client::ModelClient;
use crate::tool::{ErrorKind as ToolErrorKind, Manager as ToolManager};
pub use builder::AgentBuilder;

/// The answer given when a run hits its iteration limit.
pub const ITERATION_LIMIT_ANSWER: &str =
    "Agent stopped due to iteration limit or time limit.";

pub(crate) type ToolCallCallback = Box<dyn Fn(&ToolCallRequest) + Send + Sync>;
pub(crate) type TranscriptCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// An agent that answers one prompt at a time using a model and a toolset.
///
/// Each [`run`](Self::run) starts a fresh conversation: the system prompt,
/// if any, then the prompt. The model is sampled repeatedly; whenever it
/// asks for tools, they are executed and their output appended, until it
/// answers without calling a tool or the iteration limit is reached.
pub struct Agent {
    model_client: ModelClient,
    tool_manager: ToolManager,
    system_prompt: Option<String>,
    max_iterations: usize,
    tolerate_parsing_errors: bool,
    on_tool_call: Option<ToolCallCallback>,
    on_transcript: Option<TranscriptCallback>,
}

impl Agent {
    /// Runs the agent on `prompt` until it produces a final answer.
    ///
    /// # Errors
    ///
    /// Fails when the model provider fails, or when the model sends
    /// undecodable tool arguments and parsing errors are not tolerated.
    /// Tool failures are not errors, they are reported to the model.
    pub async fn run(&self, prompt: &str) -> Result<String, Error> {
        let mut conversation = Conversation::default();
        if let Some(system_prompt) = &self.system_prompt {
            conversation.push(ModelMessage::System(system_prompt.clone()));
        }
        conversation.push(ModelMessage::User(prompt.to_owned()));

        for iteration in 1..=self.max_iterations {
            debug!("sampling the model (iteration {iteration})");

            let request =
                conversation.to_request(self.tool_manager.definitions());
            let on_transcript = self.on_transcript.clone();
            let completion = self
                .model_client
                .complete(request, move |delta| {
                    if let Some(on_transcript) = &on_transcript {
                        on_transcript(&delta);
                    }
                })
                .await
                .map_err(Error::Provider)?;

            let message = completion.message;
            if !message.has_tool_calls() {
                debug!("got the final answer ({:?})", completion.finish_reason);
                return Ok(message.content);
            }
            let tool_calls = message.tool_calls.clone();
            conversation.push(ModelMessage::Assistant(message));

            for result in self.run_tools(tool_calls).await? {
                conversation.push(ModelMessage::Tool(result));
            }
        }

        warn!("no answer after {} iterations", self.max_iterations);
        Ok(ITERATION_LIMIT_ANSWER.to_owned())
    }

    /// Runs the requested tools concurrently, keeping results in request
    /// order.
    async fn run_tools(
        &self,
        requests: Vec<ToolCallRequest>,
    ) -> Result<Vec<ToolCallResult>, Error> {
        if let Some(on_tool_call) = &self.on_tool_call {
            for req in &requests {
                on_tool_call(req);
            }
        }

        let mut calls = Vec::with_capacity(requests.len());
        let mut futures = Vec::with_capacity(requests.len());
        self.tool_manager.handle_requests(requests, |req, fut| {
            calls.push(req);
            futures.push(fut);
        });
        let outputs = join_all(futures).await;

        let mut results = Vec::with_capacity(calls.len());
        for (req, output) in calls.into_iter().zip(outputs) {
            let content = match output {
                Ok(content) => content,
                Err(err)
                    if err.kind() == ToolErrorKind::InvalidInput
                        && !self.tolerate_parsing_errors =>
                {
                    return Err(Error::MalformedToolCall {
                        name: req.name,
                        reason: err.reason().to_owned(),
                    });
                }
                Err(err) => {
                    debug!("tool `{}` failed: {err}", req.name);
                    format!("Error: {}", err.reason())
                }
            };
            results.push(ToolCallResult::answering(&req, content));
        }
        Ok(results)
    }
}
