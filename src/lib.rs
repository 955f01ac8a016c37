//! # dbg_agent
//!
//! Bridges an interactive debugger to an AI assistant and to external tools.
//!
//! The debugging session can only be driven from the thread that owns it.
//! External callers (HTTP clients, MCP tool clients, the `dbg-agent` CLI)
//! therefore never touch it directly: they submit work to a
//! [`HandoffQueue`] and block, while the owning thread runs an
//! [`ExecutorLoop`] that executes one command at a time and hands each result
//! back to exactly the caller that submitted it.
//!
//! On top of the queue, [`AgentSessionManager`] keeps one long-lived agent
//! handle per provider, primes it with the system prompt on its first turn,
//! applies Bring-Your-Own-Key credentials, and keeps the provider's resumable
//! conversation id in step with the debug target through a [`SessionStore`].
//!
//! ## Wiring a debugger extension
//!
//! ```ignore
//! use std::rc::Rc;
//! use std::sync::Arc;
//! use dbg_agent::{AgentHost, FileSessionStore, SettingsStore};
//!
//! let mut host = AgentHost::new(
//!     Rc::new(MyDebugger::attach()?),
//!     Box::new(MyAgentFactory),
//!     SettingsStore::open_default()?,
//!     Arc::new(FileSessionStore::open_default()?),
//! );
//! host.run("http 127.0.0.1")?; // serves until Ctrl+C or POST /shutdown
//! ```
//!
//! ## Modules
//!
//! - [`handoff`] - queue, pending commands, executor loop
//! - [`session`] - agent session manager, session stores, prompt composition
//! - [`agent`] - provider seam (`Agent`, `AgentFactory`, `Provider`)
//! - [`debugger`] - debugger seam (`DebugSession`)
//! - [`frontend`] - HTTP and MCP frontends
//! - [`host`] - the `!agent` command surface
//! - [`settings`] - persisted user settings
//! - [`client`] - HTTP client used by the CLI

pub mod agent;
pub mod client;
pub mod debugger;
pub mod error;
pub mod frontend;
pub mod handoff;
pub mod host;
pub mod session;
pub mod settings;
pub mod types;

pub use agent::{
    Agent, AgentEvent, AgentFactory, ByokConfig, DEBUGGER_TOOL_NAME, DebuggerTool, HostContext,
    Provider,
};
pub use debugger::DebugSession;
pub use error::{AgentError, Result};
pub use frontend::{FrontendKind, FrontendServer};
pub use handoff::{
    CommandHandler, CommandKind, ExecutorConfig, ExecutorLoop, ExecutorReport, HandoffQueue,
    PendingCommand, QueueState, StopReason, handler_fn,
};
pub use host::AgentHost;
pub use session::{
    ABORTED, AbortSignal, AgentSessionManager, Ensured, FileSessionStore, MemorySessionStore,
    RuntimeContext, SessionStore,
};
pub use settings::{ByokSettings, Settings, SettingsStore};
pub use types::{ConversationId, TargetId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
