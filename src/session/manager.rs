//! Agent session lifecycle
//!
//! One [`AgentSessionManager`] lives on the thread that owns the debugging
//! session. It keeps at most one live agent handle and reconciles it with the
//! current settings and target before every ask.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};

use super::cancel::AbortSignal;
use super::prompt::{RuntimeContext, compose_message, full_system_prompt};
use super::store::SessionStore;
use crate::agent::{
    Agent, AgentEvent, AgentFactory, ByokConfig, DEBUGGER_TOOL_NAME, DebuggerTool, HostContext,
    Provider,
};
use crate::debugger::DebugSession;
use crate::error::{AgentError, Result};
use crate::settings::Settings;
use crate::types::{ConversationId, TargetId};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Result text of a cancelled ask or tool call
pub const ABORTED: &str = "(Aborted)";

const TOOL_DESCRIPTION: &str = "Execute a debugger command against the current target and \
     return its output. Use it to inspect the process, memory, threads and exceptions.";

const TOOL_PARAMETERS: &[&str] = &["command"];

// ============================================================================
// AGENT SESSION MANAGER
// ============================================================================

/// What [`AgentSessionManager::ensure`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    /// A new handle was built and initialized
    Created,
    /// The existing handle was kept
    Reused,
}

/// Owns the agent handle and its conversation state
pub struct AgentSessionManager {
    factory: Box<dyn AgentFactory>,
    store: Arc<dyn SessionStore>,
    debugger: Rc<dyn DebugSession>,
    abort: AbortSignal,
    host: HostContext,
    started: DateTime<Local>,

    agent: Option<Box<dyn Agent>>,
    provider: Provider,
    provider_name: String,
    target: Option<TargetId>,
    session_id: Option<ConversationId>,
    system_prompt: String,
    primed: bool,
    /// BYOK credentials the live handle was built with
    byok: Option<ByokConfig>,
}

impl AgentSessionManager {
    /// Create a manager with no live handle
    pub fn new(
        factory: Box<dyn AgentFactory>,
        store: Arc<dyn SessionStore>,
        debugger: Rc<dyn DebugSession>,
    ) -> Self {
        let abort = AbortSignal::new();
        let host = host_context(Rc::clone(&debugger), abort.clone());
        Self {
            factory,
            store,
            debugger,
            abort,
            host,
            started: Local::now(),
            agent: None,
            provider: Provider::default(),
            provider_name: String::new(),
            target: None,
            session_id: None,
            system_prompt: String::new(),
            primed: false,
            byok: None,
        }
    }

    /// Override the session start stamped into the runtime context
    #[must_use]
    pub fn with_session_start(mut self, started: DateTime<Local>) -> Self {
        self.started = started;
        self
    }

    /// Make sure a handle exists that matches `settings` and `target`.
    ///
    /// Idempotent for an unchanged (provider, target) pair: the second call
    /// neither rebuilds the handle nor touches the session store. A provider
    /// switch or any change to the active BYOK credentials replaces the handle.
    ///
    /// # Errors
    /// Returns [`AgentError::AgentInit`] if the handle cannot be created or
    /// initialized; no partially built handle is left behind.
    pub fn ensure(&mut self, target: &TargetId, settings: &Settings) -> Result<Ensured> {
        let byok = settings.active_byok();
        if self.agent.is_some() {
            if self.provider != settings.default_provider {
                log::info!(
                    "Provider changed {} -> {}; invalidating agent",
                    self.provider,
                    settings.default_provider
                );
                self.reset();
            } else if self.byok != byok {
                log::info!(
                    "BYOK configuration changed (active: {}); invalidating agent",
                    byok.is_some()
                );
                self.reset();
            }
        }

        let ctx = self.runtime_context();

        let mut outcome = Ensured::Reused;
        if self.agent.is_none() {
            self.create_agent(target, settings, &ctx)?;
            outcome = Ensured::Created;
        }

        let prompt = full_system_prompt(&settings.custom_prompt, Some(&ctx));
        if prompt != self.system_prompt {
            log::debug!("System prompt changed; will re-prime");
            self.system_prompt = prompt;
            self.primed = false;
        }

        if self.target.as_ref() != Some(target) {
            log::info!("Target changed to '{target}'");
            self.target = Some(target.clone());
            if self.byok.is_none() {
                self.reconcile_session_id(target);
            }
            self.primed = false;
        }

        self.abort.reset();
        Ok(outcome)
    }

    fn create_agent(
        &mut self,
        target: &TargetId,
        settings: &Settings,
        ctx: &RuntimeContext,
    ) -> Result<()> {
        let provider = settings.default_provider;
        log::info!("Creating {provider} agent for target '{target}'");

        let mut agent = self.factory.create(provider).map_err(|e| {
            AgentError::agent_init(format!("Failed to create agent: {provider} - {e}"))
        })?;

        agent.register_tool(self.debugger_tool());
        self.provider = provider;
        self.provider_name = agent.provider_name();
        self.system_prompt = full_system_prompt(&settings.custom_prompt, Some(ctx));
        self.primed = false;

        let byok = settings.active_byok();
        if let Some(config) = &byok {
            log::debug!("Applying BYOK configuration for {provider}");
            agent.set_byok(config.clone());
        }
        if settings.response_timeout_ms > 0 {
            agent.set_response_timeout(Duration::from_millis(settings.response_timeout_ms));
        }

        if byok.is_none() {
            self.session_id = self.store.get(target, provider);
            if let Some(id) = &self.session_id {
                log::debug!("Resuming conversation {id}");
                agent.set_session_id(id);
            }
        }

        if let Err(e) = agent.initialize() {
            let detail = agent.last_error().unwrap_or_else(|| e.to_string());
            let message = format!("Failed to initialize: {} - {detail}", agent.provider_name());
            log::error!("{message}");
            agent.shutdown();
            self.reset();
            return Err(AgentError::agent_init(message));
        }

        self.target = Some(target.clone());
        self.byok = byok;
        self.agent = Some(agent);
        Ok(())
    }

    fn reconcile_session_id(&mut self, target: &TargetId) {
        let on_record = self.store.get(target, self.provider);
        if on_record == self.session_id {
            return;
        }
        let Some(agent) = self.agent.as_mut() else {
            return;
        };
        log::info!(
            "Switching conversation {:?} -> {:?}",
            self.session_id.as_ref().map(ConversationId::as_str),
            on_record.as_ref().map(ConversationId::as_str)
        );
        agent.clear_session();
        if let Some(id) = &on_record {
            agent.set_session_id(id);
        }
        self.session_id = on_record;
    }

    /// Run one assistant turn on the live handle.
    ///
    /// Returns [`ABORTED`] if the operator interrupted before or during the turn.
    ///
    /// # Errors
    /// Returns [`AgentError::AgentInit`] when no handle exists, or the
    /// provider's error when the round trip fails.
    pub fn ask(&mut self, text: &str) -> Result<String> {
        let Some(agent) = self.agent.as_mut() else {
            return Err(AgentError::agent_init("Agent is not initialized"));
        };

        if self.host.should_abort() {
            log::info!("Ask skipped: interrupted");
            return Ok(ABORTED.to_string());
        }

        let message = compose_message(&self.system_prompt, self.primed, text);
        let response = agent.query_hosted(&message, &self.host)?;
        self.primed = true;

        if self.byok.is_none()
            && let Some(id) = agent.session_id()
            && !id.is_empty()
            && self.session_id.as_ref() != Some(&id)
        {
            if let Some(target) = &self.target {
                log::debug!("Persisting conversation {id} for '{target}'");
                self.store.set(target, self.provider, &id);
            }
            self.session_id = Some(id);
        }

        if self.abort.is_aborted() {
            return Ok(ABORTED.to_string());
        }
        Ok(response)
    }

    /// Shut down and discard the handle, clearing all conversation state.
    /// Safe without a handle.
    pub fn reset(&mut self) {
        if let Some(mut agent) = self.agent.take() {
            log::info!("Shutting down {} agent", self.provider_name);
            agent.shutdown();
        }
        self.provider_name.clear();
        self.target = None;
        self.session_id = None;
        self.system_prompt.clear();
        self.primed = false;
        self.byok = None;
    }

    /// Start a fresh conversation for `target`, forgetting the stored id
    pub fn clear_conversation(&mut self, target: &TargetId, provider: Provider) {
        if let Some(agent) = self.agent.as_mut() {
            agent.clear_session();
            self.session_id = None;
            self.primed = false;
        }
        self.store.clear(target, provider);
    }

    /// Recompute the system prompt with a new custom section; the next ask
    /// re-primes
    pub fn set_system_prompt_custom(&mut self, custom: &str) {
        if self.agent.is_none() {
            return;
        }
        let ctx = self.runtime_context();
        self.system_prompt = full_system_prompt(custom, Some(&ctx));
        self.primed = false;
    }

    /// Forward a new response timeout to the live handle
    pub fn apply_response_timeout(&mut self, ms: u64) {
        if let Some(agent) = self.agent.as_mut() {
            agent.set_response_timeout(Duration::from_millis(ms));
        }
    }

    /// Runtime context for the current debugger state
    #[must_use]
    pub fn runtime_context(&self) -> RuntimeContext {
        RuntimeContext::gather(self.debugger.as_ref(), self.started)
    }

    /// Flag polled by the debugger tool
    #[must_use]
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.agent.is_some()
    }

    #[must_use]
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    #[must_use]
    pub fn provider(&self) -> Option<Provider> {
        self.agent.as_ref().map(|_| self.provider)
    }

    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&ConversationId> {
        self.session_id.as_ref()
    }

    #[must_use]
    pub fn target(&self) -> Option<&TargetId> {
        self.target.as_ref()
    }

    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn debugger_tool(&self) -> DebuggerTool {
        let debugger = Rc::clone(&self.debugger);
        let abort = self.abort.clone();
        DebuggerTool::new(
            DEBUGGER_TOOL_NAME,
            TOOL_DESCRIPTION,
            TOOL_PARAMETERS,
            move |command| {
                if abort.is_aborted() {
                    return ABORTED.to_string();
                }
                debugger.execute(command)
            },
        )
    }
}

impl Drop for AgentSessionManager {
    fn drop(&mut self) {
        self.reset();
    }
}

impl fmt::Debug for AgentSessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSessionManager")
            .field("initialized", &self.agent.is_some())
            .field("provider", &self.provider)
            .field("target", &self.target)
            .field("session_id", &self.session_id)
            .field("primed", &self.primed)
            .finish_non_exhaustive()
    }
}

fn host_context(debugger: Rc<dyn DebugSession>, abort: AbortSignal) -> HostContext {
    let dbg = Rc::clone(&debugger);
    HostContext::new(
        move || {
            if dbg.is_interrupted() {
                abort.abort();
            }
            abort.is_aborted()
        },
        move |event| match event {
            AgentEvent::ContentDelta(text) => debugger.output_thinking(text),
            AgentEvent::ContentComplete(text) => {
                debugger.output("\n");
                debugger.output_response(if text.is_empty() { "(No output)" } else { text });
            }
            AgentEvent::Error(text) => {
                debugger.output_error(if text.is_empty() { "Error" } else { text });
            }
        },
    )
}
