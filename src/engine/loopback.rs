//! In-process engine
//!
//! Every session is a `watch` channel of messages living in this process.
//! The persona side answers each user line and, when asked for someone
//! else, attaches the matching navigation tool call just as the remote
//! engine would. Failures can be injected per operation.

use super::{Engine, EngineError, SessionHandle, SessionId};
use crate::messages::{Message, ToolCall};
use crate::session::SessionConfig;
use crate::tools::{NEXT_PERSONA, PREVIOUS_PERSONA};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info};
use uuid::Uuid;

struct LoopbackSession {
    persona_id: String,
    messages_tx: watch::Sender<Vec<Message>>,
    microphone_enabled: bool,
    audio_started: bool,
    next_seq: u64,
}

impl LoopbackSession {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_seq += 1;
        format!("{}-{}", prefix, self.next_seq)
    }

    fn push(&self, message: Message) {
        self.messages_tx.send_modify(|messages| messages.push(message));
    }
}

#[derive(Default)]
struct Failures {
    /// Number of upcoming connects to fail
    connects: usize,
    disconnects: bool,
    audio: bool,
    sends: bool,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, LoopbackSession>,
    connect_attempts: Vec<SessionConfig>,
    disconnects: usize,
    failures: Failures,
}

/// In-process engine for the CLI and for tests
pub struct LoopbackEngine {
    inner: Mutex<Inner>,
    hold_connects: AtomicBool,
    connect_gate: Semaphore,
    auto_reply: bool,
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackEngine {
    /// Engine whose personas answer every user line
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            hold_connects: AtomicBool::new(false),
            connect_gate: Semaphore::new(0),
            auto_reply: true,
        }
    }

    /// Engine that only records user lines, never replying
    pub fn silent() -> Self {
        Self {
            auto_reply: false,
            ..Self::new()
        }
    }

    // === Failure injection ===

    /// Fail the next `count` connect attempts
    pub fn fail_connects(&self, count: usize) {
        self.inner.lock().failures.connects = count;
    }

    pub fn fail_disconnects(&self, fail: bool) {
        self.inner.lock().failures.disconnects = fail;
    }

    pub fn fail_audio(&self, fail: bool) {
        self.inner.lock().failures.audio = fail;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.inner.lock().failures.sends = fail;
    }

    /// Park every subsequent connect until `release_connect` is called
    pub fn hold_connects(&self) {
        self.hold_connects.store(true, Ordering::SeqCst);
    }

    /// Let one parked connect proceed
    pub fn release_connect(&self) {
        self.connect_gate.add_permits(1);
    }

    // === Inspection ===

    /// Configurations of every connect attempt, failed ones included
    pub fn connect_attempts(&self) -> Vec<SessionConfig> {
        self.inner.lock().connect_attempts.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.inner.lock().connect_attempts.len()
    }

    /// Disconnect calls, failed ones included
    pub fn disconnect_count(&self) -> usize {
        self.inner.lock().disconnects
    }

    pub fn live_sessions(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_live(&self, id: &SessionId) -> bool {
        self.inner.lock().sessions.contains_key(id)
    }

    pub fn microphone_enabled(&self, id: &SessionId) -> bool {
        self.inner
            .lock()
            .sessions
            .get(id)
            .map(|s| s.microphone_enabled)
            .unwrap_or(false)
    }

    pub fn audio_started(&self, id: &SessionId) -> bool {
        self.inner
            .lock()
            .sessions
            .get(id)
            .map(|s| s.audio_started)
            .unwrap_or(false)
    }

    /// Append a message to a session's remote stream as if the engine sent it
    pub fn push_remote(&self, id: &SessionId, message: Message) -> Result<(), EngineError> {
        let inner = self.inner.lock();
        let session = inner
            .sessions
            .get(id)
            .ok_or_else(|| EngineError::SessionClosed(id.clone()))?;
        session.push(message);
        Ok(())
    }

    fn reply_to(text: &str) -> (String, Option<ToolCall>) {
        let lowered = text.to_lowercase();
        if lowered.contains("someone else") || lowered.contains("next") {
            (
                "Sure, let me find someone else.".to_string(),
                Some(ToolCall::navigation(NEXT_PERSONA)),
            )
        } else if lowered.contains("previous") || lowered.contains("go back") {
            (
                "Going back to who you talked to before.".to_string(),
                Some(ToolCall::navigation(PREVIOUS_PERSONA)),
            )
        } else {
            (format!("You said: {}", text), None)
        }
    }
}

#[async_trait]
impl Engine for LoopbackEngine {
    async fn connect(&self, config: &SessionConfig) -> Result<SessionHandle, EngineError> {
        // Give concurrent callers a chance to interleave, as a network call would
        tokio::task::yield_now().await;

        if self.hold_connects.load(Ordering::SeqCst) {
            let permit = self
                .connect_gate
                .acquire()
                .await
                .map_err(|e| EngineError::Transport(e.to_string()))?;
            permit.forget();
        }

        let mut inner = self.inner.lock();
        inner.connect_attempts.push(config.clone());

        if inner.failures.connects > 0 {
            inner.failures.connects -= 1;
            return Err(EngineError::Connection(format!(
                "injected failure for persona {}",
                config.persona_id
            )));
        }

        let id = SessionId::new(Uuid::new_v4().to_string());
        let (messages_tx, messages_rx) = watch::channel(Vec::new());
        inner.sessions.insert(
            id.clone(),
            LoopbackSession {
                persona_id: config.persona_id.clone(),
                messages_tx,
                microphone_enabled: false,
                audio_started: false,
                next_seq: 0,
            },
        );

        info!("Loopback session {} opened for persona {}", id, config.persona_id);
        Ok(SessionHandle::new(id, config.persona_id.clone(), messages_rx))
    }

    async fn disconnect(&self, handle: &SessionHandle) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        inner.disconnects += 1;

        if inner.failures.disconnects {
            return Err(EngineError::Transport("injected disconnect failure".to_string()));
        }

        match inner.sessions.remove(handle.id()) {
            Some(session) => {
                debug!(
                    "Loopback session {} closed (persona {})",
                    handle.id(),
                    session.persona_id
                );
                Ok(())
            }
            None => Err(EngineError::SessionClosed(handle.id().clone())),
        }
    }

    async fn send_text(&self, handle: &SessionHandle, text: &str) -> Result<(), EngineError> {
        tokio::task::yield_now().await;

        let mut inner = self.inner.lock();
        if inner.failures.sends {
            return Err(EngineError::Transport("injected send failure".to_string()));
        }

        let session = inner
            .sessions
            .get_mut(handle.id())
            .ok_or_else(|| EngineError::SessionClosed(handle.id().clone()))?;

        let user_id = session.next_id("user");
        session.push(Message::user(user_id, text));

        if self.auto_reply {
            let (reply, tool_call) = Self::reply_to(text);
            let agent_id = session.next_id("agent");
            let message = Message::agent(agent_id, reply)
                .with_tool_calls(tool_call.into_iter().collect());
            session.push(message);
        }
        Ok(())
    }

    async fn start_audio(&self, handle: &SessionHandle) -> Result<(), EngineError> {
        tokio::task::yield_now().await;

        let mut inner = self.inner.lock();
        if inner.failures.audio {
            return Err(EngineError::Audio("injected capture failure".to_string()));
        }

        let session = inner
            .sessions
            .get_mut(handle.id())
            .ok_or_else(|| EngineError::SessionClosed(handle.id().clone()))?;
        session.audio_started = true;
        Ok(())
    }

    fn set_microphone_enabled(
        &self,
        handle: &SessionHandle,
        enabled: bool,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .get_mut(handle.id())
            .ok_or_else(|| EngineError::SessionClosed(handle.id().clone()))?;
        session.microphone_enabled = enabled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouletteConfig;
    use crate::persona::Persona;
    use crate::session::SessionConfigBuilder;

    fn config_for(id: &str) -> SessionConfig {
        SessionConfigBuilder::new(&RouletteConfig::default())
            .build(&Persona::new(id, id))
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let engine = LoopbackEngine::new();
        let handle = engine.connect(&config_for("p1")).await.unwrap();

        assert_eq!(handle.persona_id(), "p1");
        assert_eq!(engine.live_sessions(), 1);

        engine.disconnect(&handle).await.unwrap();
        assert_eq!(engine.live_sessions(), 0);
        assert!(matches!(
            engine.disconnect(&handle).await,
            Err(EngineError::SessionClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_send_text_replies_with_navigation_call() {
        let engine = LoopbackEngine::new();
        let handle = engine.connect(&config_for("p1")).await.unwrap();

        engine
            .send_text(&handle, "Can I talk to someone else?")
            .await
            .unwrap();

        let messages = handle.messages();
        assert_eq!(messages.len(), 2);
        assert!(!messages[0].is_agent);
        assert!(messages[1].is_agent);
        assert_eq!(messages[1].tool_calls, vec![ToolCall::navigation(NEXT_PERSONA)]);
    }

    #[tokio::test]
    async fn test_silent_engine_does_not_reply() {
        let engine = LoopbackEngine::silent();
        let handle = engine.connect(&config_for("p1")).await.unwrap();
        engine.send_text(&handle, "hello").await.unwrap();
        assert_eq!(handle.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_connect_failures_are_counted() {
        let engine = LoopbackEngine::new();
        engine.fail_connects(1);

        assert!(engine.connect(&config_for("p1")).await.is_err());
        assert!(engine.connect(&config_for("p1")).await.is_ok());
        assert_eq!(engine.connect_count(), 2);
        assert_eq!(engine.live_sessions(), 1);
    }

    #[tokio::test]
    async fn test_microphone_flag_requires_live_session() {
        let engine = LoopbackEngine::new();
        let handle = engine.connect(&config_for("p1")).await.unwrap();

        engine.set_microphone_enabled(&handle, true).unwrap();
        assert!(engine.microphone_enabled(handle.id()));

        engine.disconnect(&handle).await.unwrap();
        assert!(engine.set_microphone_enabled(&handle, false).is_err());
    }
}
