use crate::error::ModelProviderError;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// A backend that samples a model.
///
/// Every request carries the whole conversation, so a provider keeps no
/// per-conversation state and can be shared or dropped freely.
pub trait ModelProvider: Send + Sync {
    /// The error of a failed request or response stream.
    type Error: ModelProviderError;

    /// The streamed response of a request.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts a request.
    ///
    /// The returned future owns everything it needs, it borrows neither
    /// `self` nor `req`.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
