use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// Errors reported by a [`ModelProvider`] or its responses.
///
/// The [`ErrorKind`] lets the agent tell apart failures worth surfacing
/// differently (bad credentials, rate limits) without knowing the provider.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A chat model endpoint that can be sampled.
///
/// Providers are treated as stateless: the agent may send any number of
/// requests, each carrying the full conversation, and may drop the provider
/// at any time.
pub trait ModelProvider: Send + Sync {
    /// Error of both the request and the streamed response.
    type Error: ModelProviderError;

    /// The streamed answer.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts sampling the model with `req`.
    ///
    /// The future resolves once the answer starts streaming. It must not
    /// borrow from `self` or `req`.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
