use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool offered to the model, described the way function-calling APIs
/// expect it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// Name the model uses to call the tool.
    pub name: String,
    /// What the tool is good for, written for the model.
    pub description: String,
    /// A [JSON schema](https://json-schema.org/) of the arguments object.
    pub parameters: Value,
}

/// A call the model wants to make.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifier the result has to be answered with.
    pub id: String,
    /// Name of the tool to call.
    pub name: String,
    /// The arguments exactly as the model produced them.
    ///
    /// This is expected to be a JSON object, but models do get it wrong,
    /// so it is kept unparsed and validated by whoever runs the tool.
    pub arguments: String,
}

impl ToolCallRequest {
    /// Creates a tool call request.
    #[inline]
    pub fn new<I, N, A>(id: I, name: N, arguments: A) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        A: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// The output of a tool call, sent back to the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// The [`ToolCallRequest::id`] this answers.
    pub id: String,
    /// Plain text output. Failures are reported here too.
    pub content: String,
}

impl ToolCallResult {
    /// Creates the result for `request`.
    #[inline]
    pub fn answering<S: Into<String>>(
        request: &ToolCallRequest,
        content: S,
    ) -> Self {
        Self {
            id: request.id.clone(),
            content: content.into(),
        }
    }
}
