//! The interactive read-print loop.

use std::error::Error as StdError;
use std::io::{self, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use mcp_chat_core::conversation::Conversation;
use mcp_chat_core::{Agent, AgentError, RunResult};
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::Session;

/// Inputs that end the conversation, compared case-insensitively.
pub const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "bye"];

/// The column responses are wrapped at.
pub const WRAP_WIDTH: usize = 80;

/// Returns whether `input` asks to leave the conversation.
///
/// Only a trailing line ending is ignored, `"  bye"` is an ordinary message.
pub fn is_exit_command(input: &str) -> bool {
    let input = strip_line_ending(input);
    EXIT_COMMANDS
        .iter()
        .any(|command| input.eq_ignore_ascii_case(command))
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Formats an error followed by its sources, separated by `": "`.
pub fn display_chain(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        text.push_str(": ");
        text.push_str(&err.to_string());
        source = err.source();
    }
    text
}

/// Wraps every line of `text` to `width` columns.
///
/// Lines are wrapped independently, greedily at whitespace. Words longer
/// than a line are broken. Blank lines are kept as they are.
pub fn wrap_text(text: &str, width: usize) -> String {
    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                line.to_owned()
            } else {
                fill(line, width)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn fill(line: &str, width: usize) -> String {
    let mut chunks = split_chunks(&expand_tabs(line));
    chunks.reverse();

    let mut lines: Vec<String> = vec![];
    while !chunks.is_empty() {
        let mut current: Vec<String> = vec![];
        let mut current_len = 0;

        // Indentation survives on the first line only.
        if !lines.is_empty() && chunks.last().is_some_and(|c| is_space(c)) {
            chunks.pop();
        }

        while let Some(chunk) = chunks.pop() {
            let len = chunk.chars().count();
            if current_len + len <= width {
                current_len += len;
                current.push(chunk);
            } else {
                chunks.push(chunk);
                break;
            }
        }

        if let Some(chunk) = chunks.pop() {
            if chunk.chars().count() > width {
                let space_left = if width < 1 { 1 } else { width - current_len };
                let chars: Vec<char> = chunk.chars().collect();
                let mut end = space_left.min(chars.len());
                // Prefer the last hyphen that fits.
                if let Some(hyphen) = chars[..end].iter().rposition(|&c| c == '-') {
                    if hyphen > 0 && chars[..hyphen].iter().any(|&c| c != '-') {
                        end = hyphen + 1;
                    }
                }
                let head: String = chars[..end].iter().collect();
                if !head.is_empty() {
                    current.push(head);
                }
                chunks.push(chars[end..].iter().collect());
            } else {
                chunks.push(chunk);
            }
        }

        if current.last().is_some_and(|c| is_space(c)) {
            current.pop();
        }
        if !current.is_empty() {
            lines.push(current.concat());
        }
    }
    lines.join("\n")
}

fn expand_tabs(line: &str) -> String {
    let mut expanded = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let spaces = 8 - column % 8;
            expanded.extend(std::iter::repeat_n(' ', spaces));
            column += spaces;
        } else {
            expanded.push(if c.is_whitespace() { ' ' } else { c });
            column += 1;
        }
    }
    expanded
}

// Alternating runs of spaces and words, with words also split after
// hyphens joining letters (`co-op` but not `e-mail` or `mid-2024`).
fn split_chunks(line: &str) -> Vec<String> {
    let mut chunks = vec![];
    let mut rest = line;
    while let Some(first) = rest.chars().next() {
        let spaces = first == ' ';
        let end = rest
            .find(|c: char| (c == ' ') != spaces)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        if spaces {
            chunks.push(run.to_owned());
        } else {
            chunks.extend(split_hyphenated(run));
        }
        rest = tail;
    }
    chunks
}

fn split_hyphenated(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let is_letter = |idx: usize| {
        chars
            .get(idx)
            .is_some_and(|&c| c.is_alphabetic() || c == '_')
    };
    let is_hyphen = |idx: usize| chars.get(idx) == Some(&'-');

    let mut parts = vec![];
    let mut start = 0;
    for idx in 2..chars.len() {
        if !is_hyphen(idx) || !is_letter(idx - 1) {
            continue;
        }
        let after_word = is_letter(idx - 2)
            || (idx >= 3 && is_hyphen(idx - 2) && is_letter(idx - 3));
        let before_word = is_letter(idx + 1)
            && (is_letter(idx + 2) || (is_hyphen(idx + 2) && is_letter(idx + 3)));
        if after_word && before_word {
            parts.push(chars[start..=idx].iter().collect());
            start = idx + 1;
        }
    }
    parts.push(chars[start..].iter().collect());
    parts
}

#[inline]
fn is_space(chunk: &str) -> bool {
    chunk.starts_with(' ')
}

/// Something that answers one turn at a time.
pub trait ChatAgent {
    /// The error of a failed turn.
    type Error: StdError + 'static;

    /// Answers `input` in the context of `history`.
    fn run(
        &self,
        input: &str,
        history: Conversation,
    ) -> impl Future<Output = Result<RunResult, Self::Error>>;
}

impl ChatAgent for Agent {
    type Error = AgentError;

    #[inline]
    fn run(
        &self,
        input: &str,
        history: Conversation,
    ) -> impl Future<Output = Result<RunResult, Self::Error>> {
        Agent::run(self, input, history)
    }
}

impl ChatAgent for Session {
    type Error = AgentError;

    #[inline]
    fn run(
        &self,
        input: &str,
        history: Conversation,
    ) -> impl Future<Output = Result<RunResult, Self::Error>> {
        Session::run(self, input, history)
    }
}

/// Why [`ConsoleLoop::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// The user typed one of [`EXIT_COMMANDS`].
    ExitCommand,
    /// The input was closed.
    EndOfInput,
}

/// Reads user input line by line and prints the agent's answers.
///
/// The conversation history is owned by the loop: it is replaced by the
/// history of every successful turn and left alone when a turn fails.
pub struct ConsoleLoop<R, W> {
    input: R,
    output: W,
    spinner: bool,
    colors: bool,
}

impl<R, W> ConsoleLoop<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// Creates a plain loop, without spinner and colors.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            spinner: false,
            colors: false,
        }
    }

    /// Shows a spinner on stderr while the agent is working.
    #[inline]
    pub fn with_spinner(mut self, spinner: bool) -> Self {
        self.spinner = spinner;
        self
    }

    /// Colors the labels of the output.
    #[inline]
    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Runs the conversation until the user leaves or the input ends.
    pub async fn run<A: ChatAgent>(&mut self, agent: &A) -> io::Result<ExitReason> {
        writeln!(self.output, "\n🤖 How can I help you today?")?;

        let mut history = Conversation::new();
        loop {
            write!(self.output, "💬 ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line).await? == 0 {
                debug!("input closed");
                writeln!(self.output, "\n\nThanks for chatting!")?;
                return Ok(ExitReason::EndOfInput);
            }
            writeln!(self.output)?;

            let input = strip_line_ending(&line);
            if is_exit_command(input) {
                writeln!(self.output, "\nThanks for chatting!")?;
                return Ok(ExitReason::ExitCommand);
            }

            let spinner = self.start_spinner();
            let result = agent.run(input, history.clone()).await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }

            match result {
                Ok(result) => {
                    let label = if self.colors {
                        "Agent:".bright_cyan().bold().to_string()
                    } else {
                        "Agent:".to_owned()
                    };
                    writeln!(
                        self.output,
                        "\n{label}\n{}\n",
                        wrap_text(result.output(), WRAP_WIDTH)
                    )?;
                    history = result.into_history();
                }
                Err(err) => {
                    let reason = display_chain(&err);
                    error!("turn failed: {reason}");
                    let message =
                        wrap_text(&format!("\nError: {reason}"), WRAP_WIDTH);
                    if self.colors {
                        writeln!(self.output, "{}", message.bright_red())?;
                    } else {
                        writeln!(self.output, "{message}")?;
                    }
                    writeln!(
                        self.output,
                        "{}",
                        wrap_text(
                            "Continuing conversation despite error...\n",
                            WRAP_WIDTH
                        )
                    )?;
                }
            }
        }
    }

    fn start_spinner(&self) -> Option<ProgressBar> {
        if !self.spinner {
            return None;
        }
        let style = ProgressStyle::with_template("{spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        Some(spinner)
    }
}
