//! Pending command and its private completion signal

use std::fmt;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AgentError, Result};

/// What a submitted command asks the executor to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Run the input verbatim against the debugging session
    RawExec,
    /// Route the input through the AI assistant
    AssistantAsk,
}

impl CommandKind {
    /// Short label used in logs and protocol envelopes
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RawExec => "exec",
            Self::AssistantAsk => "ask",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
enum Completion {
    Pending,
    /// Result produced by the executor
    Done(String),
    /// Force-completed by a drain before the executor claimed it
    Drained(String),
}

/// One unit of work travelling from a submitting thread to the executor.
///
/// The result slot is written at most once. The condition variable belongs to
/// this command alone; waking one submitter never wakes another.
pub struct PendingCommand {
    id: Uuid,
    kind: CommandKind,
    input: String,
    state: Mutex<Completion>,
    done: Condvar,
}

impl PendingCommand {
    pub(crate) fn new(kind: CommandKind, input: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            input: input.into(),
            state: Mutex::new(Completion::Pending),
            done: Condvar::new(),
        }
    }

    /// Identifier used to correlate log lines for this command
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Command kind
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Raw input text
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Whether a result (real or drained) has been stored
    #[must_use]
    pub fn is_completed(&self) -> bool {
        !matches!(*self.state.lock(), Completion::Pending)
    }

    /// Store the executor's result and wake the submitter.
    ///
    /// Returns `false` if the command was already completed.
    pub(crate) fn complete(&self, result: String) -> bool {
        self.settle(Completion::Done(result))
    }

    /// Force-complete with `reason` unless a result is already present.
    pub(crate) fn drain(&self, reason: &str) -> bool {
        self.settle(Completion::Drained(reason.to_string()))
    }

    fn settle(&self, outcome: Completion) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, Completion::Pending) {
            return false;
        }
        *state = outcome;
        drop(state);
        self.done.notify_one();
        true
    }

    /// Block until the command is completed.
    ///
    /// # Errors
    /// Returns [`AgentError::Stopped`] carrying the drain text if the queue
    /// shut down before the executor picked the command up.
    pub fn wait(&self) -> Result<String> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                Completion::Done(result) => return Ok(result.clone()),
                Completion::Drained(reason) => return Err(AgentError::stopped(reason.clone())),
                Completion::Pending => self.done.wait(&mut state),
            }
        }
    }
}

impl fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCommand")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("input_len", &self.input.len())
            .field("completed", &self.is_completed())
            .finish()
    }
}
