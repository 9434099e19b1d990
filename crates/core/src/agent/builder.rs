use std::sync::Arc;

use lookout_model::{ModelProvider, ToolCallRequest};

use super::Agent;
use crate::model_client::ModelClient;
use crate::tool::{Manager as ToolManager, Tool};

/// Default limit on model samples per run.
const DEFAULT_MAX_ITERATIONS: usize = 15;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    tool_manager: ToolManager,
    system_prompt: Option<String>,
    max_iterations: usize,
    tolerate_parsing_errors: bool,
    on_tool_call: Option<super::ToolCallCallback>,
    on_transcript: Option<super::TranscriptCallback>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tool_manager: ToolManager::default(),
            system_prompt: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerate_parsing_errors: true,
            on_tool_call: None,
            on_transcript: None,
        }
    }

    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tool_manager.add_tool(tool);
        self
    }

    /// Sets how many times the model may be sampled in one run. Values
    /// below one are raised to one. Defaults to 15.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Whether undecodable tool arguments are sent back to the model as a
    /// tool error (the default) instead of failing the run.
    #[inline]
    pub fn tolerate_parsing_errors(mut self, tolerate: bool) -> Self {
        self.tolerate_parsing_errors = tolerate;
        self
    }

    /// Attaches a callback to be invoked before each tool call runs.
    #[inline]
    pub fn on_tool_call(
        mut self,
        on_tool_call: impl Fn(&ToolCallRequest) + Send + Sync + 'static,
    ) -> Self {
        self.on_tool_call = Some(Box::new(on_tool_call));
        self
    }

    /// Attaches a callback to be invoked with streamed text deltas.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent {
            model_client: self.model_client,
            tool_manager: self.tool_manager,
            system_prompt: self.system_prompt,
            max_iterations: self.max_iterations,
            tolerate_parsing_errors: self.tolerate_parsing_errors,
            on_tool_call: self.on_tool_call,
            on_transcript: self.on_transcript,
        }
    }
}
