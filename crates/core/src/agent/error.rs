use std::error::Error as StdError;
use std::fmt::{self, Display};

use mcp_chat_model::ModelProviderError;

/// The kind of [`AgentError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentErrorKind {
    /// The model provider failed to answer.
    Model,
    /// The model kept asking for tools past the configured limit.
    TooManyToolRounds,
    /// The agent stopped before answering.
    AgentGone,
}

/// Error returned by [`Agent::run`](crate::Agent::run).
#[derive(Debug)]
pub struct AgentError {
    kind: AgentErrorKind,
    message: String,
    source: Option<Box<dyn ModelProviderError>>,
}

impl AgentError {
    pub(crate) fn model(source: Box<dyn ModelProviderError>) -> Self {
        Self {
            kind: AgentErrorKind::Model,
            message: "model request failed".to_owned(),
            source: Some(source),
        }
    }

    pub(crate) fn too_many_tool_rounds(limit: usize) -> Self {
        Self {
            kind: AgentErrorKind::TooManyToolRounds,
            message: format!("gave up after {limit} tool round(s)"),
            source: None,
        }
    }

    pub(crate) fn agent_gone() -> Self {
        Self {
            kind: AgentErrorKind::AgentGone,
            message: "the agent is no longer running".to_owned(),
            source: None,
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> AgentErrorKind {
        self.kind
    }
}

impl Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for AgentError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}
