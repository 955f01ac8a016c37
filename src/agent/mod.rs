//! Seam to the AI provider client
//!
//! The provider library itself (model invocation, tool-calling protocol,
//! credential handling) lives outside this crate. This module defines the
//! surface the session manager drives: an [`Agent`] handle created by an
//! [`AgentFactory`], the single [`DebuggerTool`] the agent may call, and the
//! [`HostContext`] callbacks used during a turn.

mod host;
mod provider;

use std::fmt;
use std::time::Duration;

use crate::error::Result;
use crate::types::ConversationId;

pub use host::{AgentEvent, HostContext};
pub use provider::{ByokConfig, Provider};

/// Name under which raw execution is exposed to the agent
pub const DEBUGGER_TOOL_NAME: &str = "dbg_exec";

/// A long-lived conversation handle for one provider
pub trait Agent {
    /// Provider name as reported by the client library
    fn provider_name(&self) -> String;

    /// Register a callable tool
    fn register_tool(&mut self, tool: DebuggerTool);

    /// Use operator-supplied credentials instead of the managed ones
    fn set_byok(&mut self, config: ByokConfig);

    /// Bound a single provider round trip
    fn set_response_timeout(&mut self, timeout: Duration);

    /// Resume the given persisted conversation
    fn set_session_id(&mut self, id: &ConversationId);

    /// Conversation id currently carried by the handle, if any
    fn session_id(&self) -> Option<ConversationId>;

    /// Forget the in-memory conversation
    fn clear_session(&mut self);

    /// Connect to the provider
    ///
    /// # Errors
    /// Returns the provider's diagnostic when initialization fails
    fn initialize(&mut self) -> Result<()>;

    /// Diagnostic text from the most recent failure, if the client keeps one
    fn last_error(&self) -> Option<String> {
        None
    }

    /// Run one user turn, invoking registered tools as needed
    ///
    /// # Errors
    /// Returns error if the round trip fails or times out
    fn query_hosted(&mut self, message: &str, host: &HostContext) -> Result<String>;

    /// Release provider resources
    fn shutdown(&mut self);
}

/// Creates agent handles by provider
pub trait AgentFactory {
    /// Construct a fresh, uninitialized handle
    ///
    /// # Errors
    /// Returns error if the provider is unavailable
    fn create(&self, provider: Provider) -> Result<Box<dyn Agent>>;
}

/// The raw-execution capability handed to an agent
pub struct DebuggerTool {
    name: &'static str,
    description: &'static str,
    parameters: &'static [&'static str],
    handler: Box<dyn Fn(&str) -> String>,
}

impl DebuggerTool {
    /// Build a tool from its handler
    pub fn new(
        name: &'static str,
        description: &'static str,
        parameters: &'static [&'static str],
        handler: impl Fn(&str) -> String + 'static,
    ) -> Self {
        Self {
            name,
            description,
            parameters,
            handler: Box::new(handler),
        }
    }

    /// Tool name
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Tool description shown to the model
    #[must_use]
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Parameter names
    #[must_use]
    pub fn parameters(&self) -> &'static [&'static str] {
        self.parameters
    }

    /// Invoke the tool
    pub fn invoke(&self, input: &str) -> String {
        (self.handler)(input)
    }
}

impl fmt::Debug for DebuggerTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebuggerTool")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}
