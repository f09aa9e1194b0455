use std::future::ready;
use std::time::Duration;

use mcp_chat_model::{ModelMessage, Role, ToolCallRequest};
use mcp_chat_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::timeout;

use crate::conversation::Conversation;
use crate::tool::{Tool, ToolResult};
use crate::{AgentBuilder, AgentErrorKind, RunResult};

#[derive(Deserialize)]
struct EchoInput {
    text: String,
}

struct EchoTool(Value);

impl EchoTool {
    fn new() -> Self {
        Self(json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        }))
    }
}

impl Tool for EchoTool {
    type Input = EchoInput;

    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes the text back"
    }

    fn parameter_schema(&self) -> &Value {
        &self.0
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(Ok(input.text))
    }
}

fn text(s: &str) -> PresetEvent {
    PresetEvent::MessageDelta(s.to_owned())
}

fn tool_call(id: &str, name: &str, arguments: Value) -> PresetEvent {
    PresetEvent::ToolCall(ToolCallRequest {
        id: id.to_owned(),
        name: name.to_owned(),
        arguments,
    })
}

async fn run(
    agent: &crate::Agent,
    input: &str,
    history: Conversation,
) -> Result<RunResult, crate::AgentError> {
    timeout(Duration::from_secs(5), agent.run(input, history))
        .await
        .expect("turn timed out")
}

#[tokio::test]
async fn test_simple_message() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        text("Hi, "),
        text("what can I do for you?"),
    ]));

    let agent = AgentBuilder::with_model_provider(model_provider)
        .with_system_prompt("You are terse.")
        .build();
    let result = run(&agent, "Hello", Conversation::new()).await.unwrap();

    assert_eq!(result.output(), "Hi, what can I do for you?");
    // The system prompt is never part of the history.
    let roles: Vec<_> = result.all_messages().iter().map(|i| i.role()).collect();
    assert_eq!(roles, [Role::User, Role::Assistant]);
    assert_eq!(result.all_messages()[0].transcript(), "Hello");
}

#[tokio::test]
async fn test_tool_round() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        text("Let me echo that."),
        tool_call("call_1", "echo", json!({ "text": "ping" })),
    ]));
    model_provider.add_tool_result_step();
    model_provider
        .add_assistant_response_step(PresetResponse::with_events([text("pong")]));

    let agent = AgentBuilder::with_model_provider(model_provider)
        .with_tool(EchoTool::new())
        .build();
    let result = run(&agent, "Echo ping", Conversation::new()).await.unwrap();

    assert_eq!(result.output(), "pong");
    let items = result.all_messages();
    let roles: Vec<_> = items.iter().map(|i| i.role()).collect();
    assert_eq!(
        roles,
        [Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    let ModelMessage::Tool(tool_result) = items[2].message() else {
        panic!("expected a tool result, got {:?}", items[2]);
    };
    assert_eq!(tool_result.id, "call_1");
    assert_eq!(tool_result.content, "ping");
}

#[tokio::test]
async fn test_tool_failures_are_reported_to_model() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        tool_call("call_1", "read_file", json!({ "path": "/etc/hosts" })),
        tool_call("call_2", "echo", json!({ "message": "wrong field" })),
        tool_call("call_3", "echo", json!({ "text": "fine" })),
    ]));
    model_provider.add_tool_result_step();
    model_provider.add_tool_result_step();
    model_provider.add_tool_result_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        text("Two of them failed."),
    ]));

    let agent = AgentBuilder::with_model_provider(model_provider)
        .with_tool(EchoTool::new())
        .build();
    let result = run(&agent, "Try things", Conversation::new()).await.unwrap();

    let items = result.all_messages();
    assert_eq!(items.len(), 6);
    // Results keep the request order whatever order the tools finish in.
    assert_eq!(items[2].transcript(), "Error: no tool named `read_file`");
    assert!(items[3].transcript().starts_with("Error: "));
    assert_eq!(items[4].transcript(), "fine");
    assert_eq!(result.output(), "Two of them failed.");
}

#[tokio::test]
async fn test_failed_turn_keeps_history() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        text("First answer."),
    ]));
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(
        PresetResponse::with_events([text("Second answer.")]).with_failures(1),
    );

    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .build();
    let history = run(&agent, "One", Conversation::new())
        .await
        .unwrap()
        .into_history();
    assert_eq!(history.len(), 2);

    let err = run(&agent, "Two", history.clone()).await.unwrap_err();
    assert_eq!(err.kind(), AgentErrorKind::Model);
    assert!(std::error::Error::source(&err).is_some());

    // The caller still owns the previous history and simply retries.
    let result = run(&agent, "Two", history).await.unwrap();
    assert_eq!(result.output(), "Second answer.");
    assert_eq!(result.all_messages().len(), 4);
    assert_eq!(model_provider.attempts(3), 2);
}

#[tokio::test]
async fn test_too_many_tool_rounds() {
    let mut model_provider = TestModelProvider::default();
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        tool_call("call_1", "echo", json!({ "text": "again" })),
    ]));
    model_provider.add_tool_result_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        tool_call("call_2", "echo", json!({ "text": "and again" })),
    ]));

    let agent = AgentBuilder::with_model_provider(model_provider)
        .with_tool(EchoTool::new())
        .with_max_tool_rounds(1)
        .build();
    let err = run(&agent, "Loop", Conversation::new()).await.unwrap_err();
    assert_eq!(err.kind(), AgentErrorKind::TooManyToolRounds);
}

#[tokio::test]
async fn test_queued_turns() {
    let mut model_provider = TestModelProvider::default();
    model_provider.set_delay(Duration::from_millis(5));
    model_provider.add_user_input_step();
    model_provider.add_assistant_response_step(PresetResponse::with_events([
        text("Same "),
        text("answer."),
    ]));

    let agent = AgentBuilder::with_model_provider(model_provider.clone())
        .build();
    let first = agent.run("A", Conversation::new());
    let second = agent.run("B", Conversation::new());
    let (first, second) = timeout(Duration::from_secs(5), async {
        tokio::join!(first, second)
    })
    .await
    .unwrap();

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.all_messages()[0].transcript(), "A");
    assert_eq!(second.all_messages()[0].transcript(), "B");
    assert_eq!(second.output(), "Same answer.");
    assert_eq!(model_provider.attempts(1), 2);
}
