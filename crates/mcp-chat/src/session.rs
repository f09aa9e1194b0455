use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Display};

use mcp_chat_core::conversation::Conversation;
use mcp_chat_core::tool::Tool;
use mcp_chat_core::{Agent, AgentBuilder, AgentError, RunResult};
use mcp_chat_mcp::{McpServers, ServerDescriptor, StartError};
use mcp_chat_model::ModelProvider;

use crate::tools::McpTool;

/// Error starting a [`Session`].
#[derive(Debug)]
pub enum SessionError {
    /// A server could not be started.
    Start(StartError),
    /// Two tools share a name, the model couldn't tell them apart.
    ToolConflict {
        /// The shared tool name.
        tool: String,
        /// Who registered the tool first.
        first: String,
        /// The server offering it again.
        second: String,
    },
}

impl Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Start(_) => write!(f, "failed to start MCP servers"),
            SessionError::ToolConflict {
                tool,
                first,
                second,
            } => write!(
                f,
                "tool `{tool}` is offered by both {first} and {second}"
            ),
        }
    }
}

impl StdError for SessionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SessionError::Start(err) => Some(err),
            SessionError::ToolConflict { .. } => None,
        }
    }
}

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    servers: Vec<ServerDescriptor>,
    tool_names: Vec<String>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self {
            agent_builder,
            servers: vec![],
            tool_names: vec![],
        }
    }

    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.agent_builder = self.agent_builder.with_system_prompt(prompt);
        self
    }

    /// Sets the MCP servers to start with the session.
    #[inline]
    pub fn with_servers(mut self, servers: Vec<ServerDescriptor>) -> Self {
        self.servers = servers;
        self
    }

    /// Registers a local tool next to the ones the servers offer.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tool_names.push(tool.name().to_owned());
        self.agent_builder = self.agent_builder.with_tool(tool);
        self
    }

    /// Returns the servers the session will start.
    #[inline]
    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }

    /// Starts the servers and builds the agent on top of their tools.
    ///
    /// Nothing keeps running if this fails.
    pub async fn start(self) -> Result<Session, SessionError> {
        let Self {
            mut agent_builder,
            servers,
            tool_names,
        } = self;

        let servers =
            McpServers::start(servers).await.map_err(SessionError::Start)?;

        let mut owners: HashMap<String, String> = tool_names
            .into_iter()
            .map(|name| (name, "a local tool".to_owned()))
            .collect();
        let mut tools = vec![];
        let mut conflict = None;
        'servers: for server in servers.servers() {
            let server_name = server.client().name();
            for tool in server.tools() {
                if let Some(first) = owners.get(&tool.name) {
                    conflict = Some(SessionError::ToolConflict {
                        tool: tool.name.clone(),
                        first: first.clone(),
                        second: format!("`{server_name}`"),
                    });
                    break 'servers;
                }
                owners.insert(tool.name.clone(), format!("`{server_name}`"));
                tools.push(McpTool::new(server.client().clone(), tool.clone()));
            }
        }
        if let Some(err) = conflict {
            drop(tools);
            servers.shutdown().await;
            return Err(err);
        }

        info!(
            "session started with {} server(s) and {} MCP tool(s)",
            servers.servers().len(),
            tools.len()
        );
        for tool in tools {
            agent_builder = agent_builder.with_tool(tool);
        }
        Ok(Session {
            agent: agent_builder.build(),
            servers,
        })
    }
}

/// A chat session: the agent together with the MCP servers it uses.
///
/// The servers live as long as the session. Call [`Session::shutdown`] to
/// stop them gracefully; dropping the session kills them.
pub struct Session {
    agent: Agent,
    servers: McpServers,
}

impl Session {
    /// Runs one turn. See [`Agent::run`].
    #[inline]
    pub fn run<S: Into<String>>(
        &self,
        input: S,
        history: Conversation,
    ) -> impl Future<Output = Result<RunResult, AgentError>> + Send + 'static
    {
        self.agent.run(input, history)
    }

    /// Returns the agent of this session.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Returns the running servers.
    #[inline]
    pub fn servers(&self) -> &McpServers {
        &self.servers
    }

    /// Stops the agent and the servers.
    pub async fn shutdown(self) {
        let Self { agent, servers } = self;
        drop(agent);
        servers.shutdown().await;
    }
}
