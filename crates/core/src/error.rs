use lookout_model::{ErrorKind, ModelProviderError};

/// Why an agent run ended without an answer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model provider failed, either when sending the request or
    /// while streaming the response.
    #[error("model request failed: {0}")]
    Provider(Box<dyn ModelProviderError>),
    /// The model called a tool with arguments that could not be decoded,
    /// and the agent was configured not to tolerate that.
    #[error("model produced a malformed call to `{name}`: {reason}")]
    MalformedToolCall {
        /// Name of the tool the model tried to call.
        name: String,
        /// Why decoding the arguments failed.
        reason: String,
    },
}

impl Error {
    /// Returns the provider error kind, if this error came from the
    /// provider.
    pub fn provider_error_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Provider(err) => Some(err.kind()),
            Error::MalformedToolCall { .. } => None,
        }
    }
}
