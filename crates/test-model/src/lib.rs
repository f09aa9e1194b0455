//! A local fake model for testing purpose.

mod preset;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use mcp_chat_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    OpaqueMessage,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    step_idx: usize,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();

        let delay = this.delay;
        let sleep = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        let idx = this.event_idx;
        this.event_idx += 1;
        let event = match this.events.get(idx) {
            Some(PresetEvent::MessageDelta(msg)) => {
                ModelResponseEvent::MessageDelta(msg.clone())
            }
            Some(PresetEvent::ToolCall(req)) => {
                ModelResponseEvent::ToolCall(req.clone())
            }
            None if idx == this.events.len() => {
                let has_tool_call = this
                    .events
                    .iter()
                    .any(|event| matches!(event, PresetEvent::ToolCall(_)));
                ModelResponseEvent::Completed(if has_tool_call {
                    ModelFinishReason::ToolCalls
                } else {
                    ModelFinishReason::Stop
                })
            }
            // In case this method is called after completion.
            None => return Poll::Ready(Ok(None)),
        };
        Poll::Ready(Ok(Some(event)))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        let id = format!("msg:{}", self.step_idx);
        Some(OpaqueMessage::new(id.clone(), id))
    }
}

#[derive(Clone)]
enum ConversationStep {
    UserInput,
    ToolResult,
    AssistantResponse(PresetResponse),
}

/// A local fake model for testing purpose.
///
/// Before sending requests, set up the conversation script describing how
/// the model responds. A request is matched to the step at the index equal
/// to the number of non-system messages it carries, so the script has to
/// mirror the history exactly: one step per user input, per assistant
/// response and per tool result. Requests that land past the end of the
/// script, or on a step that is not an assistant response, fail.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    conversation_script: Vec<ConversationStep>,
    delay: Option<Duration>,
    // Number of requests seen so far, per step.
    attempts: Arc<Mutex<Vec<u64>>>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_assistant_response_step(&mut self, preset: PresetResponse) {
        self.conversation_script
            .push(ConversationStep::AssistantResponse(preset));
    }

    #[inline]
    pub fn add_user_input_step(&mut self) {
        self.conversation_script.push(ConversationStep::UserInput);
    }

    #[inline]
    pub fn add_tool_result_step(&mut self) {
        self.conversation_script.push(ConversationStep::ToolResult);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns how many requests have been made for the step at `step_idx`.
    pub fn attempts(&self, step_idx: usize) -> u64 {
        let attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        attempts.get(step_idx).copied().unwrap_or(0)
    }

    fn respond(&self, req: &ModelRequest) -> Result<TestModelResponse, Error> {
        let step_idx = req
            .messages
            .iter()
            .filter(|msg| !matches!(msg, ModelMessage::System(_)))
            .count();

        let attempt = {
            let mut attempts =
                self.attempts.lock().unwrap_or_else(|e| e.into_inner());
            if attempts.len() <= step_idx {
                attempts.resize(step_idx + 1, 0);
            }
            attempts[step_idx] += 1;
            attempts[step_idx]
        };

        let preset = match self.conversation_script.get(step_idx) {
            Some(ConversationStep::AssistantResponse(preset)) => preset,
            Some(_) => {
                return Err(Error {
                    message: "not an assistant response step",
                    kind: ErrorKind::Moderated,
                });
            }
            None => {
                return Err(Error {
                    message: "no enough steps",
                    kind: ErrorKind::Other,
                });
            }
        };

        match preset.failures {
            Some(0) => {
                return Err(Error {
                    message: "preset failure",
                    kind: ErrorKind::RateLimitExceeded,
                });
            }
            Some(failures) if attempt <= failures => {
                return Err(Error {
                    message: "preset failure",
                    kind: ErrorKind::RateLimitExceeded,
                });
            }
            _ => {}
        }

        Ok(TestModelResponse {
            events: preset.events.clone(),
            step_idx,
            event_idx: 0,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            sleep: None,
        })
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(self.respond(req))
    }
}

#[cfg(test)]
mod tests {
    use std::pin::pin;

    use mcp_chat_model::{
        ModelMessage, ModelRequest, ModelTool, OpaqueMessage, ToolCallRequest,
        ToolCallResult,
    };
    use serde_json::json;

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> (String, Option<ToolCallRequest>, OpaqueMessage) {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        let mut tool_call = None;
        loop {
            let event = resp.as_mut().next_event().await.unwrap().unwrap();
            match event {
                ModelResponseEvent::Completed(_) => break,
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
                ModelResponseEvent::ToolCall(req) => tool_call = Some(req),
            }
        }
        (msg, tool_call, resp.make_opaque_message().unwrap())
    }

    #[tokio::test]
    async fn test_scripted_tool_round() {
        let mut provider = TestModelProvider::default();
        provider.add_user_input_step();
        provider.add_assistant_response_step(PresetResponse::with_events([
            PresetEvent::MessageDelta("Let me look.".to_owned()),
            PresetEvent::ToolCall(ToolCallRequest {
                id: "call_1".to_owned(),
                name: "read_file".to_owned(),
                arguments: json!({ "path": "todo.txt" }),
            }),
        ]));
        provider.add_tool_result_step();
        provider.add_assistant_response_step(PresetResponse::with_events([
            PresetEvent::MessageDelta("You have ".to_owned()),
            PresetEvent::MessageDelta("two tasks.".to_owned()),
        ]));

        let mut req = ModelRequest {
            messages: vec![
                ModelMessage::System("Be helpful.".to_owned()),
                ModelMessage::User("What's on my list?".to_owned()),
            ],
            tools: vec![ModelTool {
                name: "read_file".to_owned(),
                description: "Reads a file".to_owned(),
                parameters: json!({ "type": "object" }),
            }],
        };
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, tool_call, opaque_msg) = collect_response(resp).await;
        assert_eq!(msg, "Let me look.");
        let tool_call = tool_call.unwrap();
        assert_eq!(tool_call.name, "read_file");
        assert_eq!(tool_call.arguments, json!({ "path": "todo.txt" }));

        req.messages.push(ModelMessage::Opaque(opaque_msg));
        req.messages.push(ModelMessage::Tool(ToolCallResult {
            id: tool_call.id,
            content: "- buy milk\n- call mom".to_owned(),
        }));
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, tool_call, _) = collect_response(resp).await;
        assert_eq!(msg, "You have two tasks.");
        assert!(tool_call.is_none());
    }

    #[tokio::test]
    async fn test_preset_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_user_input_step();
        provider.add_assistant_response_step(
            PresetResponse::with_events([PresetEvent::MessageDelta(
                "Finally.".to_owned(),
            )])
            .with_failures(2),
        );

        let req = ModelRequest {
            messages: vec![ModelMessage::User("Hi".to_owned())],
            tools: vec![],
        };
        for _ in 0..2 {
            let err = provider.send_request(&req).await.err().unwrap();
            assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        }
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, _, _) = collect_response(resp).await;
        assert_eq!(msg, "Finally.");
        assert_eq!(provider.attempts(1), 3);
    }

    #[tokio::test]
    async fn test_out_of_script() {
        let provider = TestModelProvider::default();
        let req = ModelRequest {
            messages: vec![ModelMessage::User("Hi".to_owned())],
            tools: vec![],
        };
        let err = provider.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
