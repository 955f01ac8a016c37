//! Newtype wrappers for type safety
//!
//! Target identities and conversation ids are both plain strings on the wire;
//! wrapping them keeps the session store from mixing them up.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Resumable conversation id issued by a provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Create a new conversation id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the conversation id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for ids that carry no conversation
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Logical debugging subject (process image or dump file) that conversation
/// state is keyed against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    /// Create a new target identity
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the target identity as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no target is attached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
