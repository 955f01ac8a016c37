//! Agent session management
//!
//! # Module Structure
//!
//! - `manager` - `AgentSessionManager`: handle lifecycle, priming, BYOK,
//!   conversation-id reconciliation
//! - `store` - `SessionStore` and its memory/file implementations
//! - `prompt` - system prompt and runtime context composition
//! - `cancel` - per-call abort flag

mod cancel;
mod manager;
mod prompt;
mod store;

pub use cancel::AbortSignal;
pub use manager::{ABORTED, AgentSessionManager, Ensured};
pub use prompt::{
    BASE_PROMPT, PROMPT_SEPARATOR, RuntimeContext, compose_message, full_system_prompt,
};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
