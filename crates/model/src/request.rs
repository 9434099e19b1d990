use crate::tool_call::{ModelTool, ToolCallRequest, ToolCallResult};

/// Everything the model sees for one sample: the whole conversation so far
/// and the tools it may call.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The conversation, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A question typed by the user.
    User(String),
    /// A message previously produced by the model.
    Assistant(AssistantMessage),
    /// The answer to one of the model's tool calls.
    Tool(ToolCallResult),
}

/// A message previously produced by the model, replayed as history.
///
/// Providers that support function calling need the original tool calls
/// alongside the text, so that the following tool results can be matched
/// to them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AssistantMessage {
    /// The text content, may be empty when the model only called tools.
    pub content: String,
    /// Tool calls requested in this message.
    pub tool_calls: Vec<ToolCallRequest>,
}

impl AssistantMessage {
    /// Creates a text-only assistant message.
    #[inline]
    pub fn text<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            tool_calls: vec![],
        }
    }

    /// Whether the model is waiting for tool results.
    #[inline]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
