use std::future::poll_fn;
use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OpaqueMessage;
use crate::error::ModelProviderError;

/// A streamed response from the model provider.
///
/// Events arrive in generation order and end with
/// [`ModelResponseEvent::Completed`]. After the stream is drained the
/// response can be turned into an [`OpaqueMessage`] for the history.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Polls for the next event.
    ///
    /// Resolves to `Ok(None)` once the response is complete, also on any
    /// later call. An `Err` ends the response.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;

    /// Waits for the next event, see [`Self::poll_next_event`].
    fn next_event(
        self: Pin<&mut Self>,
    ) -> impl Future<Output = Result<Option<ModelResponseEvent>, Self::Error>> + Send
    {
        let mut this = self;
        poll_fn(move |cx| this.as_mut().poll_next_event(cx))
    }

    /// Makes the message to keep in the history for this response.
    ///
    /// Only meaningful once all events are polled, and must return the
    /// same message every time. `None` means the provider can't replay
    /// its own messages.
    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        None
    }
}

/// The reason why a model response has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model needs to call a tool.
    ToolCalls,
    /// The model has finished generating text.
    Stop,
    /// The output was cut off by the token limit.
    Length,
}

/// Describes a tool call request from the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments to pass to the tool, usually a JSON object.
    ///
    /// Providers that fail to decode the arguments should pass
    /// [`Value::Null`] and let the tool reject it.
    pub arguments: Value,
}

/// The event from a model response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The response has been completed.
    Completed(ModelFinishReason),
    /// Received a message delta.
    MessageDelta(String),
    /// Received a tool call request.
    ToolCall(ToolCallRequest),
}
