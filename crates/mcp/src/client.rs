use std::time::Duration;

use rmcp::ServiceExt;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{Peer, RoleClient, RunningService, ServiceError};
use rmcp::transport::TokioChildProcess;
use serde_json::{Map, Value};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;

use crate::proto::{CallToolResult, Implementation, Tool};
use crate::{Error, ServerDescriptor};

/// How long to wait for the handshake and for each response by default.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A connection to one MCP server.
pub struct McpClient {
    name: String,
    peer: Peer<RoleClient>,
    // Taken out by `shutdown`.
    service: AsyncMutex<Option<RunningService<RoleClient, ()>>>,
    server_info: Option<Implementation>,
    request_timeout: Duration,
}

impl McpClient {
    /// Launches the server and performs the initialization handshake.
    ///
    /// The server process is killed if the handshake fails.
    pub async fn connect(descriptor: &ServerDescriptor) -> Result<Self, Error> {
        let name = descriptor.name().to_owned();
        let transport =
            TokioChildProcess::new(descriptor.to_command()).map_err(|err| {
                Error::spawn(format!("failed to launch `{name}`"), err)
            })?;
        debug!("spawned `{name}`");

        let service = match timeout(DEFAULT_REQUEST_TIMEOUT, ().serve(transport))
            .await
        {
            Ok(Ok(service)) => service,
            Ok(Err(err)) => {
                return Err(Error::protocol(
                    format!("`{name}` failed to initialize"),
                    err.to_string(),
                ));
            }
            Err(_) => {
                return Err(Error::timeout("initialize", DEFAULT_REQUEST_TIMEOUT));
            }
        };

        let server_info = service.peer_info().map(|info| Implementation {
            name: info.server_info.name.clone(),
            version: info.server_info.version.clone(),
        });
        match &server_info {
            Some(info) => info!("connected to `{name}` ({} {})", info.name, info.version),
            None => info!("connected to `{name}`"),
        }
        Ok(Self {
            name,
            peer: service.peer().clone(),
            service: AsyncMutex::new(Some(service)),
            server_info,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Returns the server name from its descriptor.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns what the server reported about itself, if anything.
    #[inline]
    pub fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }

    /// Sets how long to wait for each response, 30 seconds by default.
    #[inline]
    pub fn set_request_timeout(&mut self, request_timeout: Duration) {
        self.request_timeout = request_timeout;
    }

    /// Lists all tools of the server, following pagination.
    pub async fn list_tools(&self) -> Result<Vec<Tool>, Error> {
        let tools = self
            .with_timeout("tools/list", self.peer.list_all_tools())
            .await?;
        debug!("`{}` offers {} tool(s)", self.name, tools.len());
        Ok(tools.into_iter().map(Tool::from).collect())
    }

    /// Calls a tool.
    ///
    /// A tool that fails reports it with [`CallToolResult::is_error`], an
    /// `Err` means the call itself didn't go through.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, Error> {
        let request = CallToolRequestParam {
            name: name.to_owned().into(),
            arguments: Some(arguments),
        };
        let result = self
            .with_timeout("tools/call", self.peer.call_tool(request))
            .await?;
        serde_json::to_value(result)
            .and_then(serde_json::from_value)
            .map_err(|err| Error::protocol("invalid `tools/call` result", err))
    }

    /// Stops the server. Later calls fail with a closed connection.
    pub async fn shutdown(&self) {
        let Some(service) = self.service.lock().await.take() else {
            return;
        };
        debug!("shutting down `{}`", self.name);
        match service.cancel().await {
            Ok(reason) => debug!("`{}` stopped ({reason:?})", self.name),
            Err(err) => warn!("failed to stop `{}`: {err}", self.name),
        }
    }

    async fn with_timeout<T>(
        &self,
        method: &str,
        fut: impl Future<Output = Result<T, ServiceError>>,
    ) -> Result<T, Error> {
        trace!("[{}] {method}", self.name);
        match timeout(self.request_timeout, fut).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::timeout(method, self.request_timeout)),
        }
    }
}
