//! Shared test doubles: a scripted debugger, a recording agent and a
//! counting session store

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::mpsc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dbg_agent::{
    Agent, AgentError, AgentEvent, AgentFactory, ByokConfig, ConversationId, DebugSession,
    DebuggerTool, HostContext, MemorySessionStore, Provider, Result, SessionStore, TargetId,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// DEBUGGER
// ============================================================================

/// Output channel a line was written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Plain,
    Error,
    Warning,
    Thinking,
    Response,
}

/// In-process debugger with captured output
pub struct MockDebugger {
    pub target: RefCell<String>,
    pub interrupted: Cell<bool>,
    /// Set `interrupted` as a side effect of the next `execute`
    pub interrupt_on_exec: Cell<bool>,
    pub executed: RefCell<Vec<String>>,
    pub outputs: RefCell<Vec<(Channel, String)>>,
    /// Mirror of everything written, readable from another thread
    tap: RefCell<Option<mpsc::Sender<String>>>,
}

impl MockDebugger {
    pub fn new(target: &str) -> Rc<Self> {
        Rc::new(Self {
            target: RefCell::new(target.to_string()),
            interrupted: Cell::new(false),
            interrupt_on_exec: Cell::new(false),
            executed: RefCell::new(Vec::new()),
            outputs: RefCell::new(Vec::new()),
            tap: RefCell::new(None),
        })
    }

    /// Receive a copy of every output line on another thread
    pub fn tap(&self) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel();
        *self.tap.borrow_mut() = Some(tx);
        rx
    }

    pub fn set_target(&self, target: &str) {
        *self.target.borrow_mut() = target.to_string();
    }

    /// Everything written to `channel`, concatenated
    pub fn text(&self, channel: Channel) -> String {
        self.outputs
            .borrow()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, s)| s.as_str())
            .collect()
    }

    /// Everything written to any channel, concatenated
    pub fn all_text(&self) -> String {
        self.outputs.borrow().iter().map(|(_, s)| s.as_str()).collect()
    }

    pub fn clear_output(&self) {
        self.outputs.borrow_mut().clear();
    }

    fn push(&self, channel: Channel, text: &str) {
        if let Some(tap) = self.tap.borrow().as_ref() {
            let _ = tap.send(text.to_string());
        }
        self.outputs.borrow_mut().push((channel, text.to_string()));
    }
}

impl DebugSession for MockDebugger {
    fn execute(&self, command: &str) -> String {
        self.executed.borrow_mut().push(command.to_string());
        if self.interrupt_on_exec.get() {
            self.interrupted.set(true);
        }
        match command {
            "r rip" => "rip=00007ff6`12341000".to_string(),
            "kb" => "00 ntdll!NtWaitForSingleObject\n01 KERNELBASE!WaitForSingleObjectEx".to_string(),
            other => format!("output of {other}"),
        }
    }

    fn target_name(&self) -> String {
        self.target.borrow().clone()
    }

    fn target_state(&self) -> String {
        "break".to_string()
    }

    fn process_id(&self) -> u32 {
        4242
    }

    fn architecture(&self) -> String {
        "x64".to_string()
    }

    fn debugger_type(&self) -> String {
        "CDB".to_string()
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.get()
    }

    fn output(&self, text: &str) {
        self.push(Channel::Plain, text);
    }

    fn output_error(&self, text: &str) {
        self.push(Channel::Error, text);
    }

    fn output_warning(&self, text: &str) {
        self.push(Channel::Warning, text);
    }

    fn output_thinking(&self, text: &str) {
        self.push(Channel::Thinking, text);
    }

    fn output_response(&self, text: &str) {
        self.push(Channel::Response, text);
    }
}

// ============================================================================
// AGENT
// ============================================================================

/// Everything the agents built by a [`MockFactory`] were asked to do
#[derive(Debug, Default)]
pub struct AgentRecord {
    pub created: Vec<Provider>,
    pub tools: Vec<&'static str>,
    pub byok: Vec<ByokConfig>,
    pub timeouts: Vec<Duration>,
    pub resumed: Vec<String>,
    pub cleared: usize,
    pub initialized: usize,
    pub messages: Vec<String>,
    pub shutdowns: usize,
}

/// Behaviour of the next agents built by a [`MockFactory`]
#[derive(Debug, Default)]
pub struct AgentScript {
    pub fail_create: bool,
    pub fail_init: Option<String>,
    /// Conversation id the provider issues on the first turn of a fresh session
    pub issue_session: Option<String>,
    /// Debugger command the agent runs through its tool during a turn
    pub tool_call: Option<String>,
    pub reply: String,
}

#[derive(Debug, Default)]
pub struct AgentWorld {
    pub record: RefCell<AgentRecord>,
    pub script: RefCell<AgentScript>,
}

pub struct MockAgent {
    world: Rc<AgentWorld>,
    provider: Provider,
    session: Option<ConversationId>,
    tool: Option<DebuggerTool>,
    init_error: Option<String>,
}

impl Agent for MockAgent {
    fn provider_name(&self) -> String {
        format!("mock-{}", self.provider)
    }

    fn register_tool(&mut self, tool: DebuggerTool) {
        self.world.record.borrow_mut().tools.push(tool.name());
        self.tool = Some(tool);
    }

    fn set_byok(&mut self, config: ByokConfig) {
        self.world.record.borrow_mut().byok.push(config);
    }

    fn set_response_timeout(&mut self, timeout: Duration) {
        self.world.record.borrow_mut().timeouts.push(timeout);
    }

    fn set_session_id(&mut self, id: &ConversationId) {
        self.world
            .record
            .borrow_mut()
            .resumed
            .push(id.as_str().to_string());
        self.session = Some(id.clone());
    }

    fn session_id(&self) -> Option<ConversationId> {
        self.session.clone()
    }

    fn clear_session(&mut self) {
        self.world.record.borrow_mut().cleared += 1;
        self.session = None;
    }

    fn initialize(&mut self) -> Result<()> {
        if let Some(detail) = self.world.script.borrow().fail_init.clone() {
            self.init_error = Some(detail);
            return Err(AgentError::provider("initialize failed"));
        }
        self.world.record.borrow_mut().initialized += 1;
        Ok(())
    }

    fn last_error(&self) -> Option<String> {
        self.init_error.clone()
    }

    fn query_hosted(&mut self, message: &str, host: &HostContext) -> Result<String> {
        self.world
            .record
            .borrow_mut()
            .messages
            .push(message.to_string());

        let (tool_call, issue, reply) = {
            let script = self.world.script.borrow();
            (
                script.tool_call.clone(),
                script.issue_session.clone(),
                script.reply.clone(),
            )
        };

        let mut reply = if reply.is_empty() {
            format!("answer to: {message}")
        } else {
            reply
        };
        if let (Some(command), Some(tool)) = (tool_call, &self.tool) {
            host.emit(&AgentEvent::ContentDelta(format!("running {command}")));
            let output = tool.invoke(&command);
            if host.should_abort() {
                return Ok(output);
            }
            reply = format!("{reply} [{output}]");
        }

        if self.session.is_none()
            && let Some(id) = issue
        {
            self.session = Some(ConversationId::new(id));
        }

        host.emit(&AgentEvent::ContentComplete(reply.clone()));
        Ok(reply)
    }

    fn shutdown(&mut self) {
        self.world.record.borrow_mut().shutdowns += 1;
    }
}

/// Factory handing out [`MockAgent`]s that share one [`AgentWorld`]
pub struct MockFactory {
    world: Rc<AgentWorld>,
}

impl MockFactory {
    pub fn new() -> (Box<Self>, Rc<AgentWorld>) {
        let world = Rc::new(AgentWorld::default());
        (
            Box::new(Self {
                world: Rc::clone(&world),
            }),
            world,
        )
    }
}

impl AgentFactory for MockFactory {
    fn create(&self, provider: Provider) -> Result<Box<dyn Agent>> {
        if self.world.script.borrow().fail_create {
            return Err(AgentError::provider("provider not installed"));
        }
        self.world.record.borrow_mut().created.push(provider);
        Ok(Box::new(MockAgent {
            world: Rc::clone(&self.world),
            provider,
            session: None,
            tool: None,
            init_error: None,
        }))
    }
}

// ============================================================================
// SESSION STORE
// ============================================================================

/// Memory store that counts calls
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: MemorySessionStore,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub clears: AtomicUsize,
}

impl CountingStore {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.gets() + self.sets() + self.clears()
    }

    /// Seed an entry without counting it
    pub fn seed(&self, target: &str, provider: Provider, id: &str) {
        self.inner
            .set(&TargetId::new(target), provider, &ConversationId::new(id));
    }

    /// Read an entry without counting it
    pub fn peek(&self, target: &str, provider: Provider) -> Option<String> {
        self.inner
            .get(&TargetId::new(target), provider)
            .map(|id| id.as_str().to_string())
    }
}

impl SessionStore for CountingStore {
    fn get(&self, target: &TargetId, provider: Provider) -> Option<ConversationId> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(target, provider)
    }

    fn set(&self, target: &TargetId, provider: Provider, id: &ConversationId) {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(target, provider, id);
    }

    fn clear(&self, target: &TargetId, provider: Provider) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear(target, provider);
    }
}
