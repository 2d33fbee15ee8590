//! Engine capability surface
//!
//! The remote real-time conversational service, seen only through the
//! handful of operations the core needs. Transport, codecs and audio capture
//! live behind this trait.

pub mod loopback;

pub use loopback::LoopbackEngine;

use crate::messages::Message;
use crate::session::SessionConfig;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tokio::sync::watch;

/// Engine-assigned session identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors reported by engine implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("session {0} is not live")]
    SessionClosed(SessionId),

    #[error("audio capture unavailable: {0}")]
    Audio(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// One live connection to the engine
///
/// Cloning yields another view of the same session, not a second session.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    persona_id: String,
    messages: watch::Receiver<Vec<Message>>,
}

impl SessionHandle {
    pub fn new(
        id: SessionId,
        persona_id: impl Into<String>,
        messages: watch::Receiver<Vec<Message>>,
    ) -> Self {
        Self {
            id,
            persona_id: persona_id.into(),
            messages,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn persona_id(&self) -> &str {
        &self.persona_id
    }

    /// Snapshot of the authoritative remote message sequence
    pub fn messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    /// Receiver notified on every push update of the message sequence
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.clone()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("persona_id", &self.persona_id)
            .finish_non_exhaustive()
    }
}

/// Operations the core consumes from the engine
///
/// `set_microphone_enabled` is not a suspension point; everything else may
/// await the network.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Open a session for `config`
    async fn connect(&self, config: &SessionConfig) -> Result<SessionHandle, EngineError>;

    /// Close a session; callers treat failures as best-effort
    async fn disconnect(&self, handle: &SessionHandle) -> Result<(), EngineError>;

    /// Send user text into the conversation
    async fn send_text(&self, handle: &SessionHandle, text: &str) -> Result<(), EngineError>;

    /// Acquire audio capture for the session
    async fn start_audio(&self, handle: &SessionHandle) -> Result<(), EngineError>;

    /// Flip the session's microphone flag
    fn set_microphone_enabled(
        &self,
        handle: &SessionHandle,
        enabled: bool,
    ) -> Result<(), EngineError>;
}
