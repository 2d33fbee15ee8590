//! Navigation state machine
//!
//! At most one transition runs at a time; concurrent requests are rejected,
//! not queued. The index is committed only once the new session is live, so
//! a failed switch leaves the user on the persona they had.

use super::{step, NavigationRequest, NavigationState, RejectReason, TransitionOutcome};
use crate::engine::{Engine, SessionHandle};
use crate::error::{Result, RouletteError};
use crate::events::{EventSink, SessionEvent};
use crate::microphone::{MicrophoneController, MicrophonePhase};
use crate::persona::{Persona, PersonaCatalog};
use crate::session::{SessionConfig, SessionConfigBuilder};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct Inner {
    state: NavigationState,
    shut_down: bool,
}

pub struct NavigationMachine<E: Engine + ?Sized> {
    engine: Arc<E>,
    catalog: PersonaCatalog,
    builder: SessionConfigBuilder,
    microphone: Arc<MicrophoneController>,
    events: EventSink,
    inner: Mutex<Inner>,
    session: Mutex<Option<SessionHandle>>,
}

impl<E: Engine + ?Sized> NavigationMachine<E> {
    /// Create a machine at index 0 with no live session
    pub fn new(
        engine: Arc<E>,
        catalog: PersonaCatalog,
        builder: SessionConfigBuilder,
        microphone: Arc<MicrophoneController>,
        events: EventSink,
    ) -> Result<Self> {
        if catalog.is_empty() {
            return Err(RouletteError::EmptyCatalog);
        }

        Ok(Self {
            engine,
            catalog,
            builder,
            microphone,
            events,
            inner: Mutex::new(Inner::default()),
            session: Mutex::new(None),
        })
    }

    pub fn catalog(&self) -> &PersonaCatalog {
        &self.catalog
    }

    pub fn state(&self) -> NavigationState {
        self.inner.lock().state
    }

    pub fn current_index(&self) -> usize {
        self.inner.lock().state.current_index
    }

    pub fn current_persona(&self) -> &Persona {
        // Always within bounds of the non-empty catalog
        &self.catalog.as_slice()[self.current_index()]
    }

    /// The live session, if any
    pub fn session(&self) -> Option<SessionHandle> {
        self.session.lock().clone()
    }

    /// Establish the session for the current persona
    ///
    /// Used for the first session and, after a failed transition left none
    /// live, as a fresh user-triggered reconnect. Rejected while a session is
    /// live or a transition is running.
    pub async fn connect_current(&self) -> Result<TransitionOutcome> {
        let (index, config) = {
            let mut inner = self.inner.lock();
            if let Some(reason) = self.guard(&inner) {
                return Ok(self.reject(reason));
            }
            if self.session.lock().is_some() {
                return Ok(self.reject(RejectReason::AlreadyActive));
            }

            let index = inner.state.current_index;
            let config = self.build_config(index)?;
            inner.state.pending_transition = true;
            (index, config)
        };

        self.establish(index, index, config).await
    }

    pub async fn request(&self, request: NavigationRequest) -> Result<TransitionOutcome> {
        let (from, to, config) = {
            let mut inner = self.inner.lock();
            if let Some(reason) = self.guard(&inner) {
                return Ok(self.reject(reason));
            }
            if !self.catalog.is_navigable() {
                return Ok(self.reject(RejectReason::NotNavigable));
            }

            let from = inner.state.current_index;
            let len = self.catalog.len();
            let to = match request {
                NavigationRequest::Advance(direction) => step(from, direction, len),
                NavigationRequest::JumpTo(index) => {
                    if index >= len {
                        return Err(RouletteError::InvalidIndex { index, len });
                    }
                    if index == from && self.session.lock().is_some() {
                        return Ok(self.reject(RejectReason::AlreadyActive));
                    }
                    index
                }
            };

            // Built before anything is torn down: invalid persona data
            // aborts with the current session untouched.
            let config = self.build_config(to)?;
            inner.state.pending_transition = true;
            (from, to, config)
        };

        info!("Persona transition {} -> {} ({:?})", from, to, request);
        self.events.emit(SessionEvent::TransitionStarted { from, to });

        let old = self.session.lock().take();
        if self.microphone.disable(&*self.engine, old.as_ref()) {
            self.events.emit(SessionEvent::MicrophoneChanged(MicrophonePhase::Idle));
        }

        if let Some(old) = old {
            if let Err(e) = self.engine.disconnect(&old).await {
                // A stale handle must never block acquiring a new one
                warn!("Disconnect of session {} failed: {}", old.id(), e);
                self.events.emit(SessionEvent::Error(RouletteError::DisconnectError(
                    e.to_string(),
                )));
            }
        }

        self.establish(from, to, config).await
    }

    /// Release the live session and refuse further requests
    pub async fn shutdown(&self) {
        self.inner.lock().shut_down = true;

        let old = self.session.lock().take();
        self.microphone.disable(&*self.engine, old.as_ref());
        if let Some(old) = old {
            if let Err(e) = self.engine.disconnect(&old).await {
                warn!("Disconnect of session {} on shutdown failed: {}", old.id(), e);
            }
        }
        info!("Navigation shut down");
    }

    fn guard(&self, inner: &Inner) -> Option<RejectReason> {
        if inner.shut_down {
            Some(RejectReason::ShutDown)
        } else if inner.state.pending_transition {
            Some(RejectReason::InFlight)
        } else {
            None
        }
    }

    fn reject(&self, reason: RejectReason) -> TransitionOutcome {
        debug!("Navigation request rejected: {}", reason);
        self.events.emit(SessionEvent::TransitionRejected { reason });
        TransitionOutcome::Rejected(reason)
    }

    fn build_config(&self, index: usize) -> Result<SessionConfig> {
        let persona = self
            .catalog
            .get(index)
            .ok_or(RouletteError::InvalidIndex {
                index,
                len: self.catalog.len(),
            })?;
        self.builder.build(persona).map_err(|e| {
            error!("Cannot build session for persona {}: {}", index, e);
            self.events.emit(SessionEvent::Error(e.clone()));
            e
        })
    }

    /// Acquire the session for `to` and commit, or roll back to `from`
    async fn establish(
        &self,
        from: usize,
        to: usize,
        config: SessionConfig,
    ) -> Result<TransitionOutcome> {
        let connected = self.engine.connect(&config).await;

        match connected {
            Ok(handle) => {
                let committed = {
                    let mut inner = self.inner.lock();
                    inner.state.pending_transition = false;
                    if inner.shut_down {
                        false
                    } else {
                        inner.state.current_index = to;
                        *self.session.lock() = Some(handle.clone());
                        true
                    }
                };

                if !committed {
                    warn!("Session {} arrived after shutdown, releasing it", handle.id());
                    if let Err(e) = self.engine.disconnect(&handle).await {
                        warn!("Disconnect of late session {} failed: {}", handle.id(), e);
                    }
                    return Ok(TransitionOutcome::Rejected(RejectReason::ShutDown));
                }

                info!(
                    "Persona {} ({}) live on session {}",
                    to,
                    config.persona_id,
                    handle.id()
                );
                self.events.emit(SessionEvent::SessionStarted {
                    index: to,
                    persona_id: config.persona_id.clone(),
                    session_id: handle.id().clone(),
                });
                if from != to {
                    self.events.emit(SessionEvent::TransitionCompleted { from, to });
                }

                Ok(TransitionOutcome::Completed {
                    from,
                    to,
                    session: handle.id().clone(),
                })
            }
            Err(e) => {
                let index = {
                    let mut inner = self.inner.lock();
                    inner.state.pending_transition = false;
                    inner.state.current_index
                };

                let error = RouletteError::ConnectError(e.to_string());
                error!("Failed to connect persona {}: {}", to, e);
                self.events.emit(SessionEvent::TransitionFailed {
                    index,
                    target: to,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouletteConfig;
    use crate::engine::LoopbackEngine;
    use crate::navigation::Direction;

    fn machine(personas: Vec<Persona>) -> Result<NavigationMachine<LoopbackEngine>> {
        let (events, _rx) = EventSink::channel(16);
        NavigationMachine::new(
            Arc::new(LoopbackEngine::new()),
            PersonaCatalog::new(personas)?,
            SessionConfigBuilder::new(&RouletteConfig::default()),
            Arc::new(MicrophoneController::new()),
            events,
        )
    }

    #[test]
    fn test_empty_catalog_is_rejected() {
        assert!(matches!(machine(Vec::new()), Err(RouletteError::EmptyCatalog)));
    }

    #[tokio::test]
    async fn test_advance_without_session_connects_target() {
        let machine = machine(vec![Persona::new("a", "Ada"), Persona::new("b", "Bo")]).unwrap();

        let outcome = machine
            .request(NavigationRequest::Advance(Direction::Next))
            .await
            .unwrap();

        assert!(matches!(outcome, TransitionOutcome::Completed { from: 0, to: 1, .. }));
        assert_eq!(machine.current_persona().id, "b");
        assert_eq!(machine.session().map(|s| s.persona_id().to_string()), Some("b".to_string()));
    }

    #[tokio::test]
    async fn test_jump_to_current_without_session_connects() {
        let machine = machine(vec![Persona::new("a", "Ada"), Persona::new("b", "Bo")]).unwrap();

        let outcome = machine.request(NavigationRequest::JumpTo(0)).await.unwrap();

        assert!(matches!(outcome, TransitionOutcome::Completed { from: 0, to: 0, .. }));
        assert!(machine.session().is_some());
    }
}
