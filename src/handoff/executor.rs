//! Single-consumer executor loop
//!
//! Runs on the thread that owns the debugging session and is the only place
//! commands are dispatched, so at most one command is ever executing against
//! the session.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::command::{CommandKind, PendingCommand};
use super::queue::HandoffQueue;
use crate::error::{AgentError, Result};

/// Poll cadence for interrupt checks when the queue is idle
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The two capabilities the executor dispatches to
pub trait CommandHandler {
    /// Execute a raw debugger command
    ///
    /// # Errors
    /// Any error is reported to the submitter as `"Error: ..."` text
    fn exec(&mut self, command: &str) -> Result<String>;

    /// Ask the assistant
    ///
    /// # Errors
    /// Any error is reported to the submitter as `"Error: ..."` text
    fn ask(&mut self, query: &str) -> Result<String>;
}

/// [`CommandHandler`] built from a pair of closures
pub struct FnHandler<E, A> {
    exec: E,
    ask: A,
}

/// Build a handler from an exec closure and an ask closure
pub fn handler_fn<E, A>(exec: E, ask: A) -> FnHandler<E, A>
where
    E: FnMut(&str) -> Result<String>,
    A: FnMut(&str) -> Result<String>,
{
    FnHandler { exec, ask }
}

impl<E, A> CommandHandler for FnHandler<E, A>
where
    E: FnMut(&str) -> Result<String>,
    A: FnMut(&str) -> Result<String>,
{
    fn exec(&mut self, command: &str) -> Result<String> {
        (self.exec)(command)
    }

    fn ask(&mut self, query: &str) -> Result<String> {
        (self.ask)(query)
    }
}

/// Executor tuning
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Upper bound on how long the loop waits for work before re-checking
    /// the interrupt predicate
    pub poll_interval: Duration,
    /// Stop the loop after this long without any command
    pub idle_timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            idle_timeout: None,
        }
    }
}

/// Why the executor loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The queue was stopped externally (frontend shutdown, host teardown)
    Stopped,
    /// The interrupt predicate fired
    Interrupted,
    /// No command arrived within the idle timeout
    IdleTimeout,
}

/// Summary returned when the loop exits
#[derive(Debug, Clone, Serialize)]
pub struct ExecutorReport {
    /// Commands dispatched to a handler
    pub executed: u64,
    /// Commands whose handler returned an error or panicked
    pub faults: u64,
    /// Exit reason
    pub reason: StopReason,
}

/// Drains a [`HandoffQueue`] on the calling thread
pub struct ExecutorLoop<'a> {
    queue: &'a HandoffQueue,
    config: ExecutorConfig,
    interrupt: Option<Box<dyn FnMut() -> bool + 'a>>,
}

impl<'a> ExecutorLoop<'a> {
    /// Create a loop over `queue` with default configuration
    #[must_use]
    pub fn new(queue: &'a HandoffQueue) -> Self {
        Self {
            queue,
            config: ExecutorConfig::default(),
            interrupt: None,
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Install the interrupt predicate polled once per iteration
    #[must_use]
    pub fn interrupt_check(mut self, check: impl FnMut() -> bool + 'a) -> Self {
        self.interrupt = Some(Box::new(check));
        self
    }

    /// Run until the queue stops, the interrupt fires, or the idle timeout
    /// elapses. Everything still queued on exit is drained with the queue's
    /// stop text.
    ///
    /// # Errors
    /// Returns [`AgentError::InvalidConfig`] if another loop is already
    /// consuming this queue.
    pub fn run<H: CommandHandler + ?Sized>(&mut self, handler: &mut H) -> Result<ExecutorReport> {
        if !self.queue.attach_consumer() {
            return Err(AgentError::invalid_config(
                "an executor is already consuming this queue",
            ));
        }

        let mut report = ExecutorReport {
            executed: 0,
            faults: 0,
            reason: StopReason::Stopped,
        };
        let mut last_activity = Instant::now();

        while self.queue.is_running() {
            if let Some(check) = self.interrupt.as_mut()
                && check()
            {
                log::info!("Executor interrupted; stopping handoff queue");
                report.reason = StopReason::Interrupted;
                self.queue.stop();
                break;
            }

            if let Some(idle) = self.config.idle_timeout
                && last_activity.elapsed() >= idle
            {
                log::info!("Executor idle for {idle:?}; stopping handoff queue");
                report.reason = StopReason::IdleTimeout;
                self.queue.stop();
                break;
            }

            let Some(cmd) = self.queue.next(self.config.poll_interval) else {
                continue;
            };

            let (result, faulted) = dispatch(handler, &cmd);
            report.executed += 1;
            if faulted {
                report.faults += 1;
            }
            cmd.complete(result);
            last_activity = Instant::now();
        }

        self.queue.drain(self.queue.stop_text());
        self.queue.detach_consumer();
        log::info!(
            "Executor exited ({:?}): {} executed, {} faulted",
            report.reason,
            report.executed,
            report.faults
        );
        Ok(report)
    }
}

fn dispatch<H: CommandHandler + ?Sized>(handler: &mut H, cmd: &PendingCommand) -> (String, bool) {
    log::debug!("[{}] executing {} command", cmd.id(), cmd.kind());
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match cmd.kind() {
        CommandKind::RawExec => handler.exec(cmd.input()),
        CommandKind::AssistantAsk => handler.ask(cmd.input()),
    }));

    match outcome {
        Ok(Ok(output)) => (output, false),
        Ok(Err(e)) => {
            log::warn!("[{}] {} handler failed: {e}", cmd.id(), cmd.kind());
            (format!("Error: {e}"), true)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("[{}] {} handler panicked: {message}", cmd.id(), cmd.kind());
            (format!("Error: {message}"), true)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
