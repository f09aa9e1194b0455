mod builder;
mod error;
mod state;
#[cfg(test)]
mod tests;

use std::collections::{HashMap, VecDeque};

use mcp_chat_actor::define_actor;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::conversation::{Conversation, Item};
use crate::model_client::ModelClient;
use crate::tool::Executor as ToolExecutor;
pub use builder::AgentBuilder;
pub use error::{AgentError, AgentErrorKind};
use state::{AgentStage, RunTurn, Turn};

define_actor! {
    /// An agent instance, which owns a model client, the registered tools
    /// and the state of the turn in progress.
    ///
    /// Turns are processed one at a time. A turn requested while another
    /// one is running is queued and started once the agent becomes idle.
    /// Cloning an `Agent` gives another handle to the same instance.
    #[wrapper_type(Agent)]
    pub struct AgentState {
        model_client: ModelClient,
        tool_executor: ToolExecutor,
        system_prompt: Option<String>,
        max_tool_rounds: usize,
        current_stage: AgentStage,
        current_turn: Option<Turn>,
        pending_turns: VecDeque<RunTurn>,
        running_tasks: HashMap<u64, JoinHandle<()>>,
        next_task_id: u64,
    }
}

impl Agent {
    /// Runs one turn with `input` on top of `history`.
    ///
    /// The returned history is `history` followed by everything the turn
    /// produced. On failure nothing is kept, the caller's `history` is
    /// still the one to use for the next turn.
    pub fn run<S: Into<String>>(
        &self,
        input: S,
        history: Conversation,
    ) -> impl Future<Output = Result<RunResult, AgentError>> + Send + 'static
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self.handle().send(RunTurn {
            input: input.into(),
            history,
            reply_tx,
        });
        // Keep the actor alive until the turn is answered.
        let handle = self.handle().clone();
        async move {
            sent.map_err(|_| AgentError::agent_gone())?;
            let result = reply_rx.await.map_err(|_| AgentError::agent_gone());
            drop(handle);
            result?
        }
    }

    fn spawn_from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            system_prompt,
            max_tool_rounds,
            tools,
        } = builder;

        let state = AgentState {
            model_client,
            tool_executor: ToolExecutor::with_tools(tools),
            system_prompt,
            max_tool_rounds,
            current_stage: Default::default(),
            current_turn: None,
            pending_turns: Default::default(),
            running_tasks: Default::default(),
            next_task_id: 1,
        };
        Self::spawn(state, Some("agent"))
    }
}

/// The outcome of a successful turn.
#[derive(Clone, Debug)]
pub struct RunResult {
    output: String,
    history: Conversation,
}

impl RunResult {
    #[inline]
    pub(crate) fn new(output: String, history: Conversation) -> Self {
        Self { output, history }
    }

    /// Returns the final text answer of the model.
    #[inline]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns the whole history, including the items of this turn.
    #[inline]
    pub fn all_messages(&self) -> &[Item] {
        self.history.items()
    }

    /// Consumes the result, returning the history for the next turn.
    #[inline]
    pub fn into_history(self) -> Conversation {
        self.history
    }
}
