//! Durable mapping from (target, provider) to a resumable conversation id

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::agent::Provider;
use crate::error::{AgentError, Result};
use crate::settings::{config_dir, write_atomic};
use crate::types::{ConversationId, TargetId};

/// Session store collaborator
///
/// Implementations are shared between the host and the CLI, so they use
/// interior mutability.
pub trait SessionStore: Send + Sync {
    /// Conversation id on record for the pair
    fn get(&self, target: &TargetId, provider: Provider) -> Option<ConversationId>;

    /// Record a conversation id
    fn set(&self, target: &TargetId, provider: Provider, id: &ConversationId);

    /// Forget the conversation for the pair
    fn clear(&self, target: &TargetId, provider: Provider);
}

type SessionMap = HashMap<TargetId, HashMap<Provider, ConversationId>>;

/// In-memory store; nothing survives the process
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<SessionMap>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, target: &TargetId, provider: Provider) -> Option<ConversationId> {
        self.sessions.lock().get(target)?.get(&provider).cloned()
    }

    fn set(&self, target: &TargetId, provider: Provider, id: &ConversationId) {
        self.sessions
            .lock()
            .entry(target.clone())
            .or_default()
            .insert(provider, id.clone());
    }

    fn clear(&self, target: &TargetId, provider: Provider) {
        let mut sessions = self.sessions.lock();
        if let Some(by_provider) = sessions.get_mut(target) {
            by_provider.remove(&provider);
            if by_provider.is_empty() {
                sessions.remove(target);
            }
        }
    }
}

/// JSON-file store (`sessions.json` next to the settings file)
///
/// The whole map is rewritten on every change; write failures are logged and
/// the in-memory copy stays authoritative for the process.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    sessions: Mutex<SessionMap>,
}

impl FileSessionStore {
    /// Open the store at `path`, loading existing entries
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let sessions = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data)
                .map_err(|e| AgentError::settings(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SessionMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            sessions: Mutex::new(sessions),
        })
    }

    /// Open `<config_dir>/dbg-agent/sessions.json`
    ///
    /// # Errors
    /// Returns error if the platform has no config directory or the file is corrupt
    pub fn open_default() -> Result<Self> {
        Self::open(config_dir()?.join("sessions.json"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, sessions: &SessionMap) {
        let written = serde_json::to_vec_pretty(sessions)
            .map_err(AgentError::from)
            .and_then(|data| write_atomic(&self.path, &data));
        if let Err(e) = written {
            log::warn!("Failed to persist sessions to {}: {e}", self.path.display());
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, target: &TargetId, provider: Provider) -> Option<ConversationId> {
        self.sessions.lock().get(target)?.get(&provider).cloned()
    }

    fn set(&self, target: &TargetId, provider: Provider, id: &ConversationId) {
        let mut sessions = self.sessions.lock();
        sessions
            .entry(target.clone())
            .or_default()
            .insert(provider, id.clone());
        self.persist(&sessions);
    }

    fn clear(&self, target: &TargetId, provider: Provider) {
        let mut sessions = self.sessions.lock();
        let Some(by_provider) = sessions.get_mut(target) else {
            return;
        };
        if by_provider.remove(&provider).is_none() {
            return;
        }
        if by_provider.is_empty() {
            sessions.remove(target);
        }
        self.persist(&sessions);
    }
}
