//! Host callbacks the agent invokes while a turn is in flight

use std::fmt;

/// Streaming event emitted by an agent during a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Partial assistant output
    ContentDelta(String),
    /// Final assistant output for the turn
    ContentComplete(String),
    /// Provider-side error
    Error(String),
}

type AbortFn = Box<dyn Fn() -> bool>;
type EventFn = Box<dyn Fn(&AgentEvent)>;

/// Callbacks bound to the host thread for the lifetime of an agent handle.
///
/// Not `Send`: the callbacks reach into the debugging session, which must
/// stay on the thread that owns it.
pub struct HostContext {
    should_abort: AbortFn,
    on_event: EventFn,
}

impl HostContext {
    /// Build a host context from an abort predicate and an event sink
    pub fn new(
        should_abort: impl Fn() -> bool + 'static,
        on_event: impl Fn(&AgentEvent) + 'static,
    ) -> Self {
        Self {
            should_abort: Box::new(should_abort),
            on_event: Box::new(on_event),
        }
    }

    /// Poll the abort predicate
    #[must_use]
    pub fn should_abort(&self) -> bool {
        (self.should_abort)()
    }

    /// Deliver an event to the host
    pub fn emit(&self, event: &AgentEvent) {
        (self.on_event)(event);
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext").finish_non_exhaustive()
    }
}
