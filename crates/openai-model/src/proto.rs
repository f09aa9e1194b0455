use mcp_chat_model::{ModelMessage, ModelRequest, ModelTool, ToolCallRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OpenAIConfig;

/// A streamed piece of a function call. Every field may be split across
/// chunks, except for the index identifying the call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionToolCall {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCall {
    // Only meaningful while streaming, never sent back.
    #[serde(skip_serializing)]
    pub index: Option<u32>,
    pub id: Option<String>,
    pub r#type: Option<String>,
    pub function: Option<FunctionToolCall>,
}

impl ToolCall {
    /// Appends a later delta of the same call.
    pub fn merge(&mut self, delta: ToolCall) {
        fn append(field: &mut Option<String>, more: Option<String>) {
            if let Some(more) = more {
                field.get_or_insert_default().push_str(&more);
            }
        }

        append(&mut self.id, delta.id);
        append(&mut self.r#type, delta.r#type);
        let Some(function) = delta.function else {
            return;
        };
        match &mut self.function {
            Some(partial) => {
                append(&mut partial.name, function.name);
                append(&mut partial.arguments, function.arguments);
            }
            None => self.function = Some(function),
        }
    }

    /// Converts the completed call for the agent.
    ///
    /// Missing or blank arguments mean no arguments, some backends stream
    /// `""` for tools without parameters. Arguments that aren't valid JSON
    /// become `null`, which the tool then rejects.
    pub fn to_request(&self) -> ToolCallRequest {
        let function = self.function.as_ref();
        let arguments = match function.and_then(|f| f.arguments.as_deref()) {
            Some(args) if !args.trim().is_empty() => serde_json::from_str(args)
                .unwrap_or_else(|err| {
                    debug!("undecodable tool arguments: {err}");
                    Value::Null
                }),
            _ => Value::Object(Default::default()),
        };
        ToolCallRequest {
            id: self.id.clone().unwrap_or_default(),
            name: function.and_then(|f| f.name.clone()).unwrap_or_default(),
            arguments,
        }
    }
}

/// One `data:` payload of a streamed chat completion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    // The trailing usage chunk has none.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub reasoning_content: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
struct Tool {
    r#type: &'static str,
    function: FunctionTool,
}

impl From<&ModelTool> for Tool {
    fn from(tool: &ModelTool) -> Self {
        Self {
            r#type: "function",
            function: FunctionTool {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

/// A message as the chat completions API expects it.
///
/// This is also what the provider stores in an [`OpaqueMessage`], so
/// assistant messages are replayed exactly, tool calls included.
///
/// [`OpaqueMessage`]: mcp_chat_model::OpaqueMessage
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reasoning_content: Option<String>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    #[inline]
    fn assistant(content: Option<String>) -> Self {
        Message::Assistant {
            content,
            tool_calls: None,
            reasoning_content: None,
        }
    }
}

impl From<&ModelMessage> for Message {
    fn from(msg: &ModelMessage) -> Self {
        match msg {
            ModelMessage::System(content) => Message::System {
                content: content.clone(),
            },
            ModelMessage::User(content) => Message::User {
                content: content.clone(),
            },
            ModelMessage::Assistant(content) => {
                Message::assistant(Some(content.clone()))
            }
            ModelMessage::Tool(result) => Message::Tool {
                tool_call_id: result.id.clone(),
                content: result.content.clone(),
            },
            ModelMessage::Opaque(opaque) => match opaque.to_raw::<Message>() {
                Some(msg) => msg.clone(),
                None => {
                    warn!("foreign opaque message: {}", opaque.id());
                    Message::assistant(None)
                }
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
    stream: bool,
}

impl ChatCompletionRequest {
    /// Builds a streaming request for `req`.
    pub fn new(req: &ModelRequest, config: &OpenAIConfig) -> Self {
        Self {
            model: config.model.clone(),
            messages: req.messages.iter().map(Message::from).collect(),
            tools: req.tools.iter().map(Tool::from).collect(),
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
            stream: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use mcp_chat_model::{OpaqueMessage, ToolCallResult};
    use serde_json::json;

    use super::*;
    use crate::OpenAIConfigBuilder;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            messages: vec![
                ModelMessage::System("You are a helpful assistant.".to_owned()),
                ModelMessage::User("Hello".to_owned()),
            ],
            tools: vec![ModelTool {
                name: "list_directory".to_owned(),
                description: "Lists a directory.".to_owned(),
                parameters: json!({
                    "type": "object",
                    "properties": { "path": { "type": "string" } }
                }),
            }],
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .build();
        let expected = ChatCompletionRequest {
            model: "custom".to_owned(),
            messages: vec![
                Message::System {
                    content: "You are a helpful assistant.".to_owned(),
                },
                Message::User {
                    content: "Hello".to_owned(),
                },
            ],
            tools: vec![Tool {
                r#type: "function",
                function: FunctionTool {
                    name: "list_directory".to_owned(),
                    description: "Lists a directory.".to_owned(),
                    parameters: json!({
                        "type": "object",
                        "properties": { "path": { "type": "string" } }
                    }),
                },
            }],
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
            stream: true,
        };
        assert_eq!(ChatCompletionRequest::new(&request, &config), expected);
    }

    #[test]
    fn test_blank_arguments() {
        let call = |arguments: Option<&str>| ToolCall {
            index: Some(0),
            id: Some("call_1".to_owned()),
            r#type: Some("function".to_owned()),
            function: Some(FunctionToolCall {
                name: Some("list_allowed_directories".to_owned()),
                arguments: arguments.map(ToOwned::to_owned),
            }),
        };

        for arguments in [None, Some(""), Some("  \n")] {
            let req = call(arguments).to_request();
            assert_eq!(req.name, "list_allowed_directories");
            assert_eq!(req.arguments, json!({}), "{arguments:?}");
        }
        assert_eq!(call(Some(r#"{"a":1}"#)).to_request().arguments, json!({ "a": 1 }));
        assert_eq!(call(Some("{oops")).to_request().arguments, Value::Null);
    }

    #[test]
    fn test_tool_round_serialization() {
        let assistant = Message::Assistant {
            content: None,
            tool_calls: Some(vec![ToolCall {
                index: Some(0),
                id: Some("call_1".to_owned()),
                r#type: Some("function".to_owned()),
                function: Some(FunctionToolCall {
                    name: Some("list_directory".to_owned()),
                    arguments: Some(r#"{"path":"/tmp"}"#.to_owned()),
                }),
            }]),
            reasoning_content: None,
        };
        let request = ModelRequest {
            messages: vec![
                ModelMessage::User("What is in /tmp?".to_owned()),
                ModelMessage::Opaque(OpaqueMessage::new("chatcmpl-1", assistant)),
                ModelMessage::Tool(ToolCallResult {
                    id: "call_1".to_owned(),
                    content: "a.txt".to_owned(),
                }),
            ],
            tools: vec![],
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx").build();
        let value =
            serde_json::to_value(ChatCompletionRequest::new(&request, &config)).unwrap();

        assert_eq!(value["model"], "o4-mini");
        assert!(value.get("tools").is_none());
        assert_eq!(
            value["messages"][1],
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {
                        "name": "list_directory",
                        "arguments": "{\"path\":\"/tmp\"}"
                    }
                }]
            })
        );
        assert_eq!(
            value["messages"][2],
            json!({
                "role": "tool",
                "tool_call_id": "call_1",
                "content": "a.txt"
            })
        );
    }
}
