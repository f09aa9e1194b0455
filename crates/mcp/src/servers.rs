use std::sync::Arc;

use crate::proto::Tool;
use crate::{McpClient, ServerDescriptor, StartError};

/// A started server and the tools it offers.
pub struct RunningServer {
    client: Arc<McpClient>,
    tools: Vec<Tool>,
}

impl RunningServer {
    /// Returns the client, shareable with whoever calls its tools.
    #[inline]
    pub fn client(&self) -> &Arc<McpClient> {
        &self.client
    }

    /// Returns the tools listed right after the server started.
    #[inline]
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }
}

/// A group of MCP servers sharing one lifetime.
///
/// Call [`McpServers::shutdown`] to stop them gracefully. Dropping the
/// group (and every client handed out) kills the processes instead.
pub struct McpServers {
    servers: Vec<RunningServer>,
}

impl McpServers {
    /// Starts every server in order and lists its tools.
    ///
    /// Either all servers start or none stays running: on the first
    /// failure the servers started so far are shut down again.
    pub async fn start(
        descriptors: Vec<ServerDescriptor>,
    ) -> Result<Self, StartError> {
        let mut servers = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            match start_server(&descriptor).await {
                Ok(server) => servers.push(server),
                Err(err) => {
                    error!("failed to start `{}`: {err}", descriptor.name());
                    Self { servers }.shutdown().await;
                    return Err(StartError::new(descriptor.name(), err));
                }
            }
        }
        Ok(Self { servers })
    }

    /// Returns the running servers, in start order.
    #[inline]
    pub fn servers(&self) -> &[RunningServer] {
        &self.servers
    }

    /// Stops all servers.
    pub async fn shutdown(self) {
        for server in self.servers {
            server.client.shutdown().await;
        }
    }
}

async fn start_server(
    descriptor: &ServerDescriptor,
) -> Result<RunningServer, crate::Error> {
    let client = McpClient::connect(descriptor).await?;
    let tools = match client.list_tools().await {
        Ok(tools) => tools,
        Err(err) => {
            client.shutdown().await;
            return Err(err);
        }
    };
    Ok(RunningServer {
        client: Arc::new(client),
        tools,
    })
}
