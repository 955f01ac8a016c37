//! Provider selection and BYOK credentials

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// AI provider backing the agent handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Claude Code (Anthropic)
    Claude,
    /// GitHub Copilot
    #[default]
    Copilot,
}

impl Provider {
    /// Every supported provider, in display order
    pub const ALL: [Self; 2] = [Self::Claude, Self::Copilot];

    /// Short name used in settings, session keys and commands
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Copilot => "copilot",
        }
    }

    /// Human-readable description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Claude => "Claude Code (Anthropic)",
            Self::Copilot => "GitHub Copilot",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "claude-code" | "anthropic" => Ok(Self::Claude),
            "copilot" | "github" | "github-copilot" => Ok(Self::Copilot),
            other => Err(AgentError::invalid_config(format!(
                "Unknown provider: {other}"
            ))),
        }
    }
}

/// Credentials and endpoint overrides handed to an agent when BYOK is active
#[derive(Clone, PartialEq, Eq)]
pub struct ByokConfig {
    /// API key supplied by the operator
    pub api_key: String,
    /// Custom endpoint
    pub base_url: Option<String>,
    /// Model override
    pub model: Option<String>,
    /// Wire flavour of the endpoint (openai, anthropic, azure)
    pub provider_type: Option<String>,
}

impl fmt::Debug for ByokConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByokConfig")
            .field("api_key", &"********")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("provider_type", &self.provider_type)
            .finish()
    }
}
