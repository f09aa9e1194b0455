use std::pin::{Pin, pin};
use std::sync::Arc;

use mcp_chat_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, OpaqueMessage, ToolCallRequest,
};
use tracing::Instrument;

pub type SendRequestResult =
    Result<ModelClientResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A type-erased model provider that drains responses to completion.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // Erase `P` so the agent state doesn't need a generic parameter.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            let span = debug_span!("model request", messages = req.messages.len());
            Box::pin(
                async move {
                    trace!("sending request: {req:?}");
                    handle_response::<P>(fut.await).await
                }
                .instrument(span),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and collects the whole response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(&self, req: ModelRequest) -> SendRequestResult {
        (self.handler_fn)(req).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// The concatenated message deltas.
    pub transcript: String,
    pub opaque_msg: Option<OpaqueMessage>,
    /// Tool calls requested by the model, in the order they arrived.
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: Option<ModelFinishReason>,
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("request failed: {err}");
            return Err(Box::new(err));
        }
    };

    let mut transcript = String::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    let mut pinned_resp = pin!(resp);
    let opaque_msg = loop {
        let event = match pinned_resp.as_mut().next_event().await {
            Ok(Some(event)) => event,
            // Drained without errors, the full message is ready now.
            Ok(None) => break pinned_resp.make_opaque_message(),
            Err(err) => {
                error!("response stream failed: {err}");
                return Err(Box::new(err));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                transcript.push_str(&delta);
            }
            ModelResponseEvent::ToolCall(req) => tool_calls.push(req),
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    };

    debug!(
        "response finished ({finish_reason:?}) with {} tool call(s)",
        tool_calls.len()
    );

    Ok(ModelClientResponse {
        transcript,
        opaque_msg,
        tool_calls,
        finish_reason,
    })
}
