//! User settings persistence.
//!
//! Stores provider selection, response timeout, custom prompt and per-provider
//! BYOK records in `<config_dir>/dbg-agent/settings.json`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::agent::{ByokConfig, Provider};
use crate::error::{AgentError, Result};

/// Directory name under the platform config dir
pub const APP_DIR: &str = "dbg-agent";

/// Default bound on a single provider round trip
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 120_000;

/// Smallest accepted response timeout
pub const MIN_RESPONSE_TIMEOUT_MS: u64 = 1_000;

/// User settings persisted to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Provider used for new agent handles
    #[serde(default)]
    pub default_provider: Provider,

    /// Response timeout in milliseconds (0 disables the override)
    #[serde(default = "default_response_timeout")]
    pub response_timeout_ms: u64,

    /// Operator prompt appended to the base system prompt
    #[serde(default)]
    pub custom_prompt: String,

    /// BYOK records keyed by provider
    #[serde(default)]
    pub byok: HashMap<Provider, ByokSettings>,
}

fn default_response_timeout() -> u64 {
    DEFAULT_RESPONSE_TIMEOUT_MS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_provider: Provider::default(),
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            custom_prompt: String::new(),
            byok: HashMap::new(),
        }
    }
}

impl Settings {
    /// BYOK record for the current provider, if one exists
    #[must_use]
    pub fn byok(&self) -> Option<&ByokSettings> {
        self.byok.get(&self.default_provider)
    }

    /// BYOK record for the current provider, created on first use
    pub fn byok_mut(&mut self) -> &mut ByokSettings {
        self.byok.entry(self.default_provider).or_default()
    }

    /// Usable BYOK config for the current provider
    #[must_use]
    pub fn active_byok(&self) -> Option<ByokConfig> {
        self.byok().filter(|b| b.is_usable()).map(ByokSettings::to_config)
    }

    /// True when BYOK is enabled with a key for the current provider
    #[must_use]
    pub fn byok_active(&self) -> bool {
        self.byok().is_some_and(ByokSettings::is_usable)
    }

    /// Set the response timeout, enforcing the minimum
    ///
    /// # Errors
    /// Returns [`AgentError::InvalidConfig`] below one second
    pub fn set_response_timeout(&mut self, ms: u64) -> Result<()> {
        validate_timeout(ms)?;
        self.response_timeout_ms = ms;
        Ok(())
    }
}

/// Per-provider Bring Your Own Key record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByokSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub provider_type: String,
}

impl ByokSettings {
    /// Enabled and a key is present
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.api_key.is_empty()
    }

    /// Convert to the config handed to an agent
    #[must_use]
    pub fn to_config(&self) -> ByokConfig {
        ByokConfig {
            api_key: self.api_key.clone(),
            base_url: non_empty(&self.base_url),
            model: non_empty(&self.model),
            provider_type: non_empty(&self.provider_type),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Reject timeouts below [`MIN_RESPONSE_TIMEOUT_MS`]
///
/// # Errors
/// Returns [`AgentError::InvalidConfig`] below one second
pub fn validate_timeout(ms: u64) -> Result<()> {
    if ms < MIN_RESPONSE_TIMEOUT_MS {
        return Err(AgentError::invalid_config(
            "Timeout must be at least 1000 ms (1 second).",
        ));
    }
    Ok(())
}

/// Format milliseconds as a human-readable duration ("2 minutes", "1 hour 5 minutes")
#[must_use]
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        return format!("{ms} ms");
    }

    let total = ms / 1000;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let unit = |n: u64, name: &str| format!("{n} {name}{}", if n == 1 { "" } else { "s" });

    if hours > 0 {
        if minutes > 0 {
            format!("{} {}", unit(hours, "hour"), unit(minutes, "minute"))
        } else {
            unit(hours, "hour")
        }
    } else if minutes > 0 {
        if seconds > 0 {
            format!("{} {}", unit(minutes, "minute"), unit(seconds, "second"))
        } else {
            unit(minutes, "minute")
        }
    } else {
        unit(seconds, "second")
    }
}

/// Loads and saves [`Settings`] at a fixed path
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform default location
    ///
    /// # Errors
    /// Returns error if the platform has no config directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(config_dir()?.join("settings.json")))
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings; a missing file yields defaults
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(&self) -> Result<Settings> {
        match fs::read_to_string(&self.path) {
            Ok(data) => serde_json::from_str(&data).map_err(|e| {
                AgentError::settings(format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load settings, falling back to defaults on any failure
    #[must_use]
    pub fn load_or_default(&self) -> Settings {
        self.load().unwrap_or_else(|e| {
            log::warn!("Failed to load settings, using defaults: {e}");
            Settings::default()
        })
    }

    /// Save settings, creating parent directories as needed
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string_pretty(settings)?;
        write_atomic(&self.path, json.as_bytes())
    }
}

/// `<config_dir>/dbg-agent`
///
/// # Errors
/// Returns error if the platform has no config directory
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| AgentError::settings("no configuration directory on this platform"))
}

/// Write via a sibling temp file and rename
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
