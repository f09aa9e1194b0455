use std::sync::Arc;

use mcp_chat_core::tool::{Error as ToolError, Tool, ToolResult};
use mcp_chat_mcp::McpClient;
use mcp_chat_mcp::proto::{Content, Tool as McpToolDefinition};
use serde_json::{Map, Value};

/// A tool offered by an MCP server, callable by the agent.
///
/// Calls are forwarded to the server through the shared client. A result
/// flagged with `isError` becomes an execution error carrying the
/// rendered content, so the model still sees what went wrong.
pub struct McpTool {
    client: Arc<McpClient>,
    name: String,
    description: String,
    parameter_schema: Value,
}

impl McpTool {
    /// Wraps `definition` as listed by the server behind `client`.
    pub fn new(client: Arc<McpClient>, definition: McpToolDefinition) -> Self {
        Self {
            client,
            name: definition.name,
            description: definition.description.unwrap_or_default(),
            parameter_schema: definition.input_schema,
        }
    }

    /// Returns the name of the server offering this tool.
    #[inline]
    pub fn server(&self) -> &str {
        self.client.name()
    }
}

impl Tool for McpTool {
    type Input = Map<String, Value>;

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = Arc::clone(&self.client);
        let name = self.name.clone();
        async move {
            let result = client
                .call_tool(&name, input)
                .await
                .map_err(|err| {
                    warn!("calling `{name}` on `{}` failed: {err}", client.name());
                    ToolError::execution_error().with_reason(format!("{err}"))
                })?;

            let output = render_content(&result.content);
            if result.is_error {
                return Err(ToolError::execution_error().with_reason(output));
            }
            Ok(output)
        }
    }
}

/// Renders tool result content as text for the model.
///
/// Blocks are joined with newlines. Binary blocks become a placeholder
/// naming their type, resources their text or URI.
pub fn render_content(content: &[Content]) -> String {
    let blocks: Vec<_> = content
        .iter()
        .filter_map(|block| match block {
            Content::Text { text } => Some(text.clone()),
            Content::Image { mime_type, .. } => Some(format!("[image: {mime_type}]")),
            Content::Audio { mime_type, .. } => Some(format!("[audio: {mime_type}]")),
            Content::Resource { resource } => Some(
                resource.text.clone().unwrap_or_else(|| resource.uri.clone()),
            ),
            Content::ResourceLink { uri } => Some(uri.clone()),
            Content::Unknown => {
                debug!("skipping unsupported content block");
                None
            }
        })
        .collect();
    blocks.join("\n")
}
