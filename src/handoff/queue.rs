//! FIFO handoff queue shared between submitting threads and the executor

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

use super::command::{CommandKind, PendingCommand};
use crate::error::{AgentError, Result};

/// Default text stored into commands that are drained on shutdown
pub const DEFAULT_STOP_TEXT: &str = "Error: handoff queue stopped";

/// Lifecycle of the queue and its single consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// Not accepting work
    Stopped,
    /// Accepting work
    Running,
    /// Stop requested; the consumer is still finishing its current command
    Stopping,
}

struct QueueInner {
    items: VecDeque<Arc<PendingCommand>>,
    state: QueueState,
    consumer_attached: bool,
}

/// Unbounded FIFO of pending commands with a single consumer.
///
/// Every enqueued command is either completed by the executor or drained with
/// the stop text. Enqueue checks the running state inside the same critical
/// section that `stop` uses to detach the queue, so nothing can slip in after
/// the final drain.
pub struct HandoffQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
    stop_text: String,
}

impl HandoffQueue {
    /// Create a stopped queue using [`DEFAULT_STOP_TEXT`]
    #[must_use]
    pub fn new() -> Self {
        Self::with_stop_text(DEFAULT_STOP_TEXT)
    }

    /// Create a stopped queue with a custom drain text
    /// (frontends use e.g. `"Error: HTTP server stopped"`).
    pub fn with_stop_text(stop_text: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                state: QueueState::Stopped,
                consumer_attached: false,
            }),
            available: Condvar::new(),
            stop_text: stop_text.into(),
        }
    }

    /// Text used for commands drained on shutdown
    #[must_use]
    pub fn stop_text(&self) -> &str {
        &self.stop_text
    }

    /// Start accepting work.
    ///
    /// Returns `false` without changing anything if the queue is already
    /// running or still stopping.
    pub fn start(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            QueueState::Stopped => {
                inner.state = QueueState::Running;
                log::info!("Handoff queue started");
                true
            }
            QueueState::Running => false,
            QueueState::Stopping => {
                log::warn!("Handoff queue start ignored: previous consumer still stopping");
                false
            }
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> QueueState {
        self.inner.lock().state
    }

    /// Whether submissions are currently accepted
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == QueueState::Running
    }

    /// Number of commands waiting to be claimed
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether no commands are waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a command to the tail and wake the consumer, without blocking.
    ///
    /// # Errors
    /// Returns [`AgentError::NotRunning`] if the queue is not accepting work.
    pub fn enqueue(&self, kind: CommandKind, input: impl Into<String>) -> Result<Arc<PendingCommand>> {
        let command = Arc::new(PendingCommand::new(kind, input));
        {
            let mut inner = self.inner.lock();
            if inner.state != QueueState::Running {
                return Err(AgentError::NotRunning);
            }
            inner.items.push_back(Arc::clone(&command));
        }
        self.available.notify_one();
        log::debug!("[{}] queued {} command", command.id(), kind);
        Ok(command)
    }

    /// Submit a command and block until its result is available.
    ///
    /// # Errors
    /// - [`AgentError::NotRunning`] immediately if the queue is not running
    /// - [`AgentError::Stopped`] if the queue stopped before the command was claimed
    pub fn submit(&self, kind: CommandKind, input: impl Into<String>) -> Result<String> {
        self.enqueue(kind, input)?.wait()
    }

    /// Claim the oldest command, waiting at most `timeout` for one to arrive.
    pub(crate) fn next(&self, timeout: Duration) -> Option<Arc<PendingCommand>> {
        let mut inner = self.inner.lock();
        if inner.items.is_empty() && inner.state == QueueState::Running {
            let _ = self.available.wait_for(&mut inner, timeout);
        }
        inner.items.pop_front()
    }

    /// Detach everything currently queued and complete each unclaimed command
    /// with `error_text`. Returns how many commands were force-completed.
    pub fn drain(&self, error_text: &str) -> usize {
        let pending = std::mem::take(&mut self.inner.lock().items);
        let drained = pending.iter().filter(|cmd| cmd.drain(error_text)).count();
        if drained > 0 {
            log::info!("Drained {drained} pending command(s): {error_text}");
        }
        drained
    }

    /// Stop accepting work and drain everything not yet claimed.
    ///
    /// A command the consumer is executing right now is not touched; it
    /// completes normally and its submitter receives the real result.
    pub fn stop(&self) {
        let pending = {
            let mut inner = self.inner.lock();
            if inner.state == QueueState::Running {
                inner.state = if inner.consumer_attached {
                    QueueState::Stopping
                } else {
                    QueueState::Stopped
                };
                log::info!("Handoff queue stopping");
            }
            std::mem::take(&mut inner.items)
        };
        self.available.notify_all();
        for cmd in &pending {
            cmd.drain(&self.stop_text);
        }
    }

    pub(crate) fn attach_consumer(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.consumer_attached {
            return false;
        }
        inner.consumer_attached = true;
        true
    }

    pub(crate) fn detach_consumer(&self) {
        let mut inner = self.inner.lock();
        inner.consumer_attached = false;
        if inner.state == QueueState::Stopping {
            inner.state = QueueState::Stopped;
            log::info!("Handoff queue stopped");
        }
    }
}

impl Default for HandoffQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HandoffQueue {
    fn drop(&mut self) {
        self.stop();
    }
}
