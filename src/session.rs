//! Interactive chat loop.
//!
//! Each turn sends exactly one message: the system prompt on the priming
//! call, then only the latest user line. Earlier turns are never resent.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::core::{ChatCompletions, ChatError, Message};

/// Priming prompt sent when no other is configured. The text is Spanish:
/// "You are an AI assistant that helps users find information."
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Es un asistente de inteligencia artificial que ayuda a los usuarios a encontrar información.";
pub const PROMPT: &str = "User (Exit to quit): ";
pub const REPLY_PREFIX: &str = "Bot: ";
pub const EXIT_KEYWORD: &str = "exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Priming,
    AwaitingInput,
    Sending,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    ExitKeyword,
    EndOfInput,
}

/// Outcome of a session that ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// User lines that were sent (the priming call is not counted).
    pub turns: usize,
    pub exit: ExitReason,
}

pub struct ChatSession<C: ChatCompletions> {
    client: C,
    deployment: String,
    system_prompt: String,
    state: SessionState,
}

impl<C: ChatCompletions> ChatSession<C> {
    pub fn new(client: C, deployment: impl Into<String>) -> Self {
        Self {
            client,
            deployment: deployment.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            state: SessionState::Priming,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Prime the deployment, then answer lines from `input` until the exit
    /// keyword or end of input. The first client error ends the session.
    pub async fn run<R, W>(
        &mut self,
        mut input: R,
        output: &mut W,
    ) -> Result<SessionSummary, ChatError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(deployment = %self.deployment, "Starting chat session");
        let result = self.drive(&mut input, output).await;
        self.state = SessionState::Terminated;

        match &result {
            Ok(summary) => {
                info!(turns = summary.turns, exit = ?summary.exit, "Chat session ended")
            }
            Err(e) => debug!(error = %e, "Chat session aborted"),
        }
        result
    }

    async fn drive<R, W>(
        &mut self,
        input: &mut R,
        output: &mut W,
    ) -> Result<SessionSummary, ChatError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.state = SessionState::Priming;
        let priming = [Message::system(self.system_prompt.as_str())];
        let completion = self.client.complete(&self.deployment, &priming).await?;
        debug!(id = %completion.id, "Priming call completed");

        let mut turns = 0;
        let mut line = String::new();

        loop {
            self.state = SessionState::AwaitingInput;
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            line.clear();
            if input.read_line(&mut line).await? == 0 {
                return Ok(SessionSummary {
                    turns,
                    exit: ExitReason::EndOfInput,
                });
            }

            let text = strip_line_ending(&line);
            if is_exit_keyword(text) {
                return Ok(SessionSummary {
                    turns,
                    exit: ExitReason::ExitKeyword,
                });
            }

            self.state = SessionState::Sending;
            // Single-turn request: only the current line goes out.
            let messages = [Message::user(text)];
            let completion = self.client.complete(&self.deployment, &messages).await?;
            let reply = completion.first_text()?;

            output
                .write_all(format!("{REPLY_PREFIX}{reply}\n").as_bytes())
                .await?;
            output.flush().await?;
            turns += 1;
        }
    }
}

/// Case-insensitive match against the exit keyword. Surrounding whitespace
/// is significant, so `" exit"` is sent as a message.
pub fn is_exit_keyword(line: &str) -> bool {
    line.to_lowercase() == EXIT_KEYWORD
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
