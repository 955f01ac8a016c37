//! Shared type definitions
//!
//! - [`identifiers`] - Type-safe ID wrappers (`ConversationId`, `TargetId`)

pub mod identifiers;

pub use identifiers::{ConversationId, TargetId};
