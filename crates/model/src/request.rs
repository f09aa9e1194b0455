use std::fmt::{self, Display};

use serde_json::Value;

use crate::OpaqueMessage;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The input messages.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
}

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The human on the other side of the console.
    User,
    /// The model.
    Assistant,
    /// Output of a tool call.
    Tool,
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        f.write_str(s)
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
    /// A tool call result.
    Tool(ToolCallResult),
    /// An opaque message (usually the history message from the model).
    ///
    /// Opaque messages are always authored by the assistant.
    Opaque(OpaqueMessage),
}

impl ModelMessage {
    /// Returns the role of the message author.
    #[inline]
    pub fn role(&self) -> Role {
        match self {
            ModelMessage::System(_) => Role::System,
            ModelMessage::User(_) => Role::User,
            ModelMessage::Assistant(_) | ModelMessage::Opaque(_) => {
                Role::Assistant
            }
            ModelMessage::Tool(_) => Role::Tool,
        }
    }
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The result of the tool call.
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roles() {
        let opaque = OpaqueMessage::new("msg:1", ());
        assert_eq!(ModelMessage::System("s".into()).role(), Role::System);
        assert_eq!(ModelMessage::User("u".into()).role(), Role::User);
        assert_eq!(ModelMessage::Opaque(opaque).role(), Role::Assistant);
        let result = ToolCallResult {
            id: "call_1".to_owned(),
            content: "ok".to_owned(),
        };
        assert_eq!(ModelMessage::Tool(result).role(), Role::Tool);
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
