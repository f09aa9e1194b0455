use std::fmt::{self, Debug};

use mcp_chat_actor::{Actor, Message};
use mcp_chat_model::{ModelMessage, ModelRequest, ToolCallResult};
use tokio::sync::oneshot;

use super::{AgentError, AgentState, RunResult};
use crate::conversation::{Conversation, Item};
use crate::model_client::{ModelClientResponse, SendRequestResult};
use crate::tool::ToolResult;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AgentStage {
    #[default]
    Idle,
    ModelThinking,
    RunningTools,
}

type ReplySender = oneshot::Sender<Result<RunResult, AgentError>>;

/// The turn in progress.
pub struct Turn {
    history: Conversation,
    tool_rounds: usize,
    // One slot per requested tool call, in request order.
    tool_results: Vec<(String, Option<String>)>,
    reply_tx: ReplySender,
}

impl AgentState {
    fn enqueue_turn(&mut self, turn: RunTurn, handle: &Actor<Self>) {
        if self.current_stage != AgentStage::Idle {
            // Picked up by `process_next_turn` once the current one ends.
            debug!("agent is busy, queueing the turn");
            self.pending_turns.push_back(turn);
            return;
        }
        self.start_turn(turn, handle);
    }

    fn process_next_turn(&mut self, handle: &Actor<Self>) {
        if self.current_stage != AgentStage::Idle {
            return;
        }
        if let Some(turn) = self.pending_turns.pop_front() {
            self.start_turn(turn, handle);
        }
    }

    fn start_turn(&mut self, turn: RunTurn, handle: &Actor<Self>) {
        let RunTurn {
            input,
            mut history,
            reply_tx,
        } = turn;
        if reply_tx.is_closed() {
            debug!("turn was abandoned before it started");
            return;
        }
        history.push(Item::user(input));
        self.current_turn = Some(Turn {
            history,
            tool_rounds: 0,
            tool_results: vec![],
            reply_tx,
        });
        self.request_model(handle);
    }

    fn request_model(&mut self, handle: &Actor<Self>) {
        let Some(turn) = &self.current_turn else {
            return;
        };
        self.current_stage = AgentStage::ModelThinking;

        let request = ModelRequest {
            messages: self
                .system_prompt
                .iter()
                .map(|prompt| ModelMessage::System(prompt.clone()))
                .chain(turn.history.messages().cloned())
                .collect(),
            tools: self.tool_executor.definitions(),
        };
        let model_client = self.model_client.clone();
        let handle_clone = handle.clone();
        self.spawn_task(
            async move {
                let response = model_client.send_request(request).await;
                handle_clone
                    .send(ModelClientRequestFinished { response })
                    .ok();
            },
            handle,
        );
    }

    fn handle_model_response(
        &mut self,
        resp: ModelClientResponse,
        handle: &Actor<Self>,
    ) {
        let Some(turn) = &mut self.current_turn else {
            return;
        };

        let ModelClientResponse {
            transcript,
            opaque_msg,
            tool_calls,
            finish_reason,
        } = resp;
        let msg = match opaque_msg {
            Some(opaque_msg) => ModelMessage::Opaque(opaque_msg),
            // Downgrade to a text-only message.
            None => ModelMessage::Assistant(transcript.clone()),
        };
        turn.history.push(Item::new(msg, transcript.clone()));

        if tool_calls.is_empty() {
            debug!("turn finished ({finish_reason:?})");
            let history = std::mem::take(&mut turn.history);
            self.finish_turn(Ok(RunResult::new(transcript, history)), handle);
            return;
        }

        turn.tool_rounds += 1;
        if turn.tool_rounds > self.max_tool_rounds {
            warn!("too many tool rounds, giving up");
            let err = AgentError::too_many_tool_rounds(self.max_tool_rounds);
            self.finish_turn(Err(err), handle);
            return;
        }

        self.current_stage = AgentStage::RunningTools;
        turn.tool_results = tool_calls
            .iter()
            .map(|req| (req.id.clone(), None))
            .collect();
        let futures: Vec<_> = tool_calls
            .into_iter()
            .map(|req| self.tool_executor.handle_request(req))
            .collect();
        for (slot, fut) in futures.into_iter().enumerate() {
            let handle_clone = handle.clone();
            self.spawn_task(
                async move {
                    let result = fut.await;
                    handle_clone.send(ToolFinished { slot, result }).ok();
                },
                handle,
            );
        }
    }

    fn handle_tool_result(
        &mut self,
        slot: usize,
        result: ToolResult,
        handle: &Actor<Self>,
    ) {
        let Some(turn) = &mut self.current_turn else {
            return;
        };
        let Some((_, output)) = turn.tool_results.get_mut(slot) else {
            return;
        };

        *output = Some(match result {
            Ok(output) => output,
            Err(err) => {
                debug!("tool call failed: {err}");
                format!("Error: {}", err.reason())
            }
        });

        if turn.tool_results.iter().any(|(_, output)| output.is_none()) {
            return;
        }
        for (id, output) in std::mem::take(&mut turn.tool_results) {
            let content = output.unwrap_or_default();
            let msg = ModelMessage::Tool(ToolCallResult {
                id,
                content: content.clone(),
            });
            turn.history.push(Item::new(msg, content));
        }
        self.request_model(handle);
    }

    fn finish_turn(
        &mut self,
        result: Result<RunResult, AgentError>,
        handle: &Actor<Self>,
    ) {
        if let Some(turn) = self.current_turn.take() {
            if turn.reply_tx.send(result).is_err() {
                debug!("turn result was dropped by the caller");
            }
        }
        self.current_stage = AgentStage::Idle;
        self.process_next_turn(handle);
    }

    fn spawn_task<Fut>(&mut self, fut: Fut, handle: &Actor<Self>)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task_id = self.next_task_id;
        self.next_task_id += 1;

        let handle = handle.clone();
        let task = tokio::spawn(async move {
            fut.await;
            handle.send(TaskEnded(task_id)).ok();
        });
        self.running_tasks.insert(task_id, task);
    }
}

#[derive(Debug)]
pub struct RunTurn {
    pub input: String,
    pub history: Conversation,
    pub reply_tx: ReplySender,
}

impl Message<AgentState> for RunTurn {
    fn handle(self, state: &mut AgentState, handle: &Actor<AgentState>) {
        state.enqueue_turn(self, handle);
    }
}

struct ModelClientRequestFinished {
    response: SendRequestResult,
}

impl Debug for ModelClientRequestFinished {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClientRequestFinished")
            .field("response", &self.response)
            .finish()
    }
}

impl Message<AgentState> for ModelClientRequestFinished {
    fn handle(self, state: &mut AgentState, handle: &Actor<AgentState>) {
        match self.response {
            Ok(resp) => state.handle_model_response(resp, handle),
            Err(err) => state.finish_turn(Err(AgentError::model(err)), handle),
        }
    }
}

#[derive(Debug)]
struct ToolFinished {
    slot: usize,
    result: ToolResult,
}

impl Message<AgentState> for ToolFinished {
    fn handle(self, state: &mut AgentState, handle: &Actor<AgentState>) {
        state.handle_tool_result(self.slot, self.result, handle);
    }
}

#[derive(Debug)]
struct TaskEnded(u64);

impl Message<AgentState> for TaskEnded {
    #[inline]
    fn handle(self, state: &mut AgentState, _handle: &Actor<AgentState>) {
        state.running_tasks.remove(&self.0);
    }
}
