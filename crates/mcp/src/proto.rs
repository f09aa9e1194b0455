//! The parts of the MCP data model the chat client works with.
//!
//! These are decoded from [`rmcp::model`] values and only keep what is
//! needed to offer tools to the model and render their results.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Name and version of an MCP implementation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// The implementation name.
    pub name: String,
    /// The implementation version.
    #[serde(default)]
    pub version: String,
}

/// A tool offered by a server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// The tool name, unique within its server.
    pub name: String,
    /// What the tool does.
    #[serde(default)]
    pub description: Option<String>,
    /// JSON schema of the tool arguments.
    pub input_schema: Value,
}

impl From<rmcp::model::Tool> for Tool {
    fn from(tool: rmcp::model::Tool) -> Self {
        Self {
            name: tool.name.into(),
            description: tool.description.map(Into::into),
            input_schema: Value::Object(tool.input_schema.as_ref().clone()),
        }
    }
}

/// The outcome of a `tools/call` request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// The content blocks produced by the tool.
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<Content>,
    /// Whether the tool reported a failure.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_error: bool,
}

/// A content block in a tool result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// A base64 encoded image.
    Image {
        /// The encoded image.
        data: String,
        /// The image type, e.g. `image/png`.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// A base64 encoded audio clip.
    Audio {
        /// The encoded audio.
        data: String,
        /// The audio type, e.g. `audio/wav`.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// A resource embedded in the result.
    Resource {
        /// The resource itself.
        resource: ResourceContents,
    },
    /// A link to a resource the client may read.
    ResourceLink {
        /// The resource URI.
        uri: String,
    },
    /// A block type this client doesn't know about.
    #[serde(other)]
    Unknown,
}

/// The contents of an embedded resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// The resource URI.
    pub uri: String,
    /// The resource type, if known.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// The contents, for text resources.
    #[serde(default)]
    pub text: Option<String>,
}

// Optional fields may be serialized as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_call_tool_result() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "42 files" },
                { "type": "image", "data": "iVBORw0KGgo=", "mimeType": "image/png" },
                {
                    "type": "resource",
                    "resource": { "uri": "file:///tmp/a.txt", "text": "hello" }
                },
                { "type": "hologram", "frames": 3 }
            ],
            "isError": null
        }))
        .unwrap();

        assert_eq!(result.content.len(), 4);
        assert_eq!(
            result.content[1],
            Content::Image {
                data: "iVBORw0KGgo=".to_owned(),
                mime_type: "image/png".to_owned(),
            }
        );
        assert_eq!(result.content[3], Content::Unknown);
        assert!(!result.is_error);
    }

    #[test]
    fn test_tool_from_rmcp() {
        let tool: rmcp::model::Tool = serde_json::from_value(json!({
            "name": "read_file",
            "inputSchema": {
                "type": "object",
                "properties": { "path": { "type": "string" } }
            }
        }))
        .unwrap();

        let tool = Tool::from(tool);
        assert_eq!(tool.name, "read_file");
        assert_eq!(tool.description, None);
        assert_eq!(tool.input_schema["properties"]["path"]["type"], "string");
    }
}
