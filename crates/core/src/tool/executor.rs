use std::collections::HashMap;
use std::future::ready;

use mcp_chat_model::{ModelTool, ToolCallRequest};
use tracing::Instrument;

use crate::tool::{BoxedToolFuture, Error, ToolObject};

/// An executor that handles tool call requests from the model.
pub struct Executor {
    tools: HashMap<String, Box<dyn ToolObject>>,
    // Registration order, so tool definitions are stable across requests.
    order: Vec<String>,
}

impl Executor {
    pub fn with_tools(tools: Vec<Box<dyn ToolObject>>) -> Self {
        let mut tool_map = HashMap::with_capacity(tools.len());
        let mut order = Vec::with_capacity(tools.len());
        for tool in tools {
            let name = tool.name().to_owned();
            if tool_map.insert(name.clone(), tool).is_some() {
                warn!("tool `{name}` is registered twice, keeping the last");
            } else {
                order.push(name);
            }
        }
        Self {
            tools: tool_map,
            order,
        }
    }

    pub fn definitions(&self) -> Vec<ModelTool> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Starts a tool call. Calls to unknown tools resolve to an error.
    pub fn handle_request(&self, req: ToolCallRequest) -> BoxedToolFuture {
        let Some(tool) = self.tools.get(&req.name) else {
            warn!("tool not found: {}", req.name);
            let err = Error::unknown_tool()
                .with_reason(format!("no tool named `{}`", req.name));
            return Box::pin(ready(Err(err)));
        };
        trace!("calling tool `{}` ({}): {:?}", req.name, req.id, req.arguments);
        let span = debug_span!("tool", name = %req.name, id = %req.id);
        Box::pin(tool.execute(req.arguments).instrument(span))
    }
}
