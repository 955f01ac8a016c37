//! Command handoff between request threads and the session-owning thread
//!
//! Frontend threads call [`HandoffQueue::submit`] and block; the thread that
//! owns the debugging session runs an [`ExecutorLoop`] that claims commands
//! one at a time, dispatches them to a [`CommandHandler`] and signals each
//! submitter through its own completion slot.
//!
//! # Module Structure
//!
//! - `command` - `PendingCommand` and its completion signal
//! - `queue` - the shared FIFO and its lifecycle
//! - `executor` - the single-consumer loop

mod command;
mod executor;
mod queue;

pub use command::{CommandKind, PendingCommand};
pub use executor::{
    CommandHandler, DEFAULT_POLL_INTERVAL, ExecutorConfig, ExecutorLoop, ExecutorReport, FnHandler,
    StopReason, handler_fn,
};
pub use queue::{DEFAULT_STOP_TEXT, HandoffQueue, QueueState};
