use lookout_model::{ModelMessage, ModelRequest, ModelTool};

/// The messages exchanged during one agent run.
///
/// Every run starts from an empty conversation, nothing is carried over
/// between runs.
#[derive(Clone, Default, Debug)]
pub(crate) struct Conversation {
    messages: Vec<ModelMessage>,
}

impl Conversation {
    #[inline]
    pub fn push(&mut self, msg: ModelMessage) {
        self.messages.push(msg);
    }

    #[inline]
    pub fn to_request(&self, tools: Vec<ModelTool>) -> ModelRequest {
        ModelRequest {
            messages: self.messages.clone(),
            tools,
        }
    }
}
