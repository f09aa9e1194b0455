//! Building the session from the environment.

use std::error::Error as StdError;
use std::fmt::{self, Display};

use mcp_chat_mcp::ServerDescriptor;
use mcp_chat_openai_model::{OpenAIConfigBuilder, OpenAIProvider};

use crate::SessionBuilder;

/// The model used when `OPENAI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "o4-mini";

/// The instructions sent ahead of every conversation.
pub const SYSTEM_PROMPT: &str = "You are an advanced problem-solving assistant \
with access to MCP servers and various tools. When responding to user \
requests, you must use an extended thinking process to thoroughly analyze \
problems before providing solutions. This helps you arrive at more accurate, \
comprehensive, and thoughtful responses.";

/// Error constructing the agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitError {
    /// `OPENAI_API_KEY` is not set.
    MissingApiKey,
    /// `OPENAI_MODEL` is set but empty.
    EmptyModel,
}

impl Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::MissingApiKey => {
                write!(f, "OPENAI_API_KEY environment variable is not set")
            }
            InitError::EmptyModel => {
                write!(f, "OPENAI_MODEL environment variable is empty")
            }
        }
    }
}

impl StdError for InitError {}

/// Prepares a session for `servers`, reading settings through `lookup`.
pub fn initialize<F>(
    lookup: F,
    servers: Vec<ServerDescriptor>,
) -> Result<SessionBuilder, InitError>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = lookup("OPENAI_API_KEY")
        .filter(|key| !key.is_empty())
        .ok_or(InitError::MissingApiKey)?;
    let model = lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned());
    if model.trim().is_empty() {
        return Err(InitError::EmptyModel);
    }

    let mut config = OpenAIConfigBuilder::with_api_key(api_key).with_model(model);
    if let Some(base_url) = lookup("OPENAI_BASE_URL").filter(|url| !url.is_empty()) {
        config = config.with_base_url(base_url);
    }
    let config = config.build();
    debug!("using model {} at {}", config.model(), config.base_url());

    Ok(SessionBuilder::with_model_provider(OpenAIProvider::new(config))
        .with_system_prompt(SYSTEM_PROMPT)
        .with_servers(servers))
}

/// Like [`initialize`], reading the process environment.
#[inline]
pub fn initialize_from_env(
    servers: Vec<ServerDescriptor>,
) -> Result<SessionBuilder, InitError> {
    initialize(|name| std::env::var(name).ok(), servers)
}
