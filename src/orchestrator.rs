//! Session orchestrator
//!
//! Composes the navigation machine, the microphone controller, the message
//! reconciler and the tool call interpreter behind one handle for the
//! presentation layer. Every method runs on the caller's task; the only
//! concurrency control is the navigation machine's in-flight guard.

use crate::config::RouletteConfig;
use crate::engine::{Engine, SessionHandle, SessionId};
use crate::error::{Result, RouletteError};
use crate::events::{EventSink, SessionEvent};
use crate::messages::{Message, MessageId, MessageReconciler};
use crate::microphone::{MicrophoneController, MicrophonePhase, ToggleOutcome};
use crate::navigation::{
    Direction, NavigationMachine, NavigationRequest, NavigationState, TransitionOutcome,
};
use crate::persona::{Persona, PersonaCatalog};
use crate::session::SessionConfigBuilder;
use crate::tools::navigation_requests;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Per-session bookkeeping, reset whenever the live session changes
#[derive(Default)]
struct SessionView {
    session: Option<SessionId>,
    /// Agent messages whose tool calls were already dispatched
    dispatched: HashSet<MessageId>,
}

pub struct SessionOrchestrator<E: Engine + ?Sized> {
    engine: Arc<E>,
    navigation: NavigationMachine<E>,
    microphone: Arc<MicrophoneController>,
    reconciler: MessageReconciler,
    view: Mutex<SessionView>,
    inbound: Mutex<Option<(SessionId, watch::Receiver<Vec<Message>>)>>,
    events: EventSink,
}

impl<E: Engine + ?Sized> SessionOrchestrator<E> {
    /// Create an orchestrator over a loaded catalog
    ///
    /// No session is opened until `start` is called.
    pub fn new(
        engine: Arc<E>,
        catalog: PersonaCatalog,
        config: RouletteConfig,
    ) -> Result<(Self, Receiver<SessionEvent>)> {
        config.validate()?;

        let (events, event_rx) = EventSink::channel(config.event_buffer_size);
        let microphone = Arc::new(MicrophoneController::new());
        let navigation = NavigationMachine::new(
            Arc::clone(&engine),
            catalog,
            SessionConfigBuilder::new(&config),
            Arc::clone(&microphone),
            events.clone(),
        )?;

        let orchestrator = Self {
            engine,
            navigation,
            microphone,
            reconciler: MessageReconciler::new(),
            view: Mutex::new(SessionView::default()),
            inbound: Mutex::new(None),
            events,
        };

        Ok((orchestrator, event_rx))
    }

    // === Navigation ===

    /// Open the session for the first persona
    pub async fn start(&self) -> Result<TransitionOutcome> {
        info!(
            "Starting with persona {} of {}",
            self.navigation.current_persona().name,
            self.navigation.catalog().len()
        );
        self.navigation.connect_current().await
    }

    /// Re-establish the current persona's session after a failed switch
    pub async fn reconnect(&self) -> Result<TransitionOutcome> {
        info!("Reconnect requested");
        self.navigation.connect_current().await
    }

    pub async fn advance(&self, direction: Direction) -> Result<TransitionOutcome> {
        self.navigation
            .request(NavigationRequest::Advance(direction))
            .await
    }

    pub async fn jump_to(&self, index: usize) -> Result<TransitionOutcome> {
        self.navigation.request(NavigationRequest::JumpTo(index)).await
    }

    pub async fn request(&self, request: NavigationRequest) -> Result<TransitionOutcome> {
        self.navigation.request(request).await
    }

    // === Input ===

    /// Toggle voice capture on the live session
    pub async fn toggle_microphone(&self) -> Result<ToggleOutcome> {
        let handle = self.live_session().ok_or_else(|| {
            RouletteError::CapabilityError("no live session for the microphone".to_string())
        })?;

        match self.microphone.toggle(&*self.engine, &handle).await {
            Ok(outcome) => {
                if outcome != ToggleOutcome::Rejected {
                    self.events
                        .emit(SessionEvent::MicrophoneChanged(self.microphone.phase()));
                }
                Ok(outcome)
            }
            Err(e) => {
                self.events.emit(SessionEvent::Error(e.clone()));
                Err(e)
            }
        }
    }

    /// Send user text, echoing it locally until the engine reflects it
    ///
    /// Blank text is ignored.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring blank message");
            return Ok(());
        }

        let handle = self
            .live_session()
            .ok_or_else(|| RouletteError::SendError("no live session".to_string()))?;

        let echo = self.reconciler.push_echo(text);
        if let Err(e) = self.engine.send_text(&handle, text).await {
            warn!("Failed to send message on {}: {}", handle.id(), e);
            self.reconciler.retract_echo(&echo);
            let error = RouletteError::SendError(e.to_string());
            self.events.emit(SessionEvent::Error(error.clone()));
            return Err(error);
        }
        Ok(())
    }

    // === Inbound ===

    /// Messages to render, remote sequence first, local echo as fallback
    pub fn rendered_messages(&self) -> Vec<Message> {
        let remote = self
            .live_session()
            .map(|handle| handle.messages())
            .unwrap_or_default();
        self.reconciler.render(&remote)
    }

    /// Dispatch navigation tool calls from agent messages not yet handled
    ///
    /// Requests are submitted one at a time in message and call order; each
    /// is subject to the usual guards. A message is dispatched at most once.
    pub async fn process_inbound(&self) -> Vec<Result<TransitionOutcome>> {
        let Some(handle) = self.live_session() else {
            return Vec::new();
        };

        let requests: Vec<NavigationRequest> = {
            let mut view = self.view.lock();
            handle
                .messages()
                .iter()
                .filter(|m| m.is_agent && m.has_tool_calls())
                .filter(|m| view.dispatched.insert(m.id.clone()))
                .flat_map(navigation_requests)
                .collect()
        };

        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            debug!("Submitting {:?} from tool call", request);
            outcomes.push(self.navigation.request(request).await);
        }
        outcomes
    }

    /// Wait for the next push update of the live message stream
    ///
    /// Returns false when the stream closed. Never resolves while no session
    /// is live.
    pub async fn next_inbound(&self) -> bool {
        let Some(handle) = self.live_session() else {
            return std::future::pending().await;
        };

        let mut rx = match self.inbound.lock().take() {
            Some((id, rx)) if &id == handle.id() => rx,
            _ => handle.subscribe(),
        };

        let changed = rx.changed().await.is_ok();
        if changed {
            *self.inbound.lock() = Some((handle.id().clone(), rx));
        }
        changed
    }

    // === Queries ===

    pub fn catalog(&self) -> &PersonaCatalog {
        self.navigation.catalog()
    }

    pub fn current_persona(&self) -> &Persona {
        self.navigation.current_persona()
    }

    pub fn navigation_state(&self) -> NavigationState {
        self.navigation.state()
    }

    pub fn microphone_phase(&self) -> MicrophonePhase {
        self.microphone.phase()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.navigation.session().map(|handle| handle.id().clone())
    }

    /// Release everything; further navigation requests are rejected
    pub async fn shutdown(&self) {
        self.navigation.shutdown().await;
        self.reconciler.reset();
        *self.view.lock() = SessionView::default();
        self.inbound.lock().take();
        self.events.emit(SessionEvent::Shutdown);
    }

    /// Current session, resetting per-session bookkeeping when it changed
    fn live_session(&self) -> Option<SessionHandle> {
        let handle = self.navigation.session()?;

        let mut view = self.view.lock();
        if view.session.as_ref() != Some(handle.id()) {
            debug!("Session changed to {}, resetting message state", handle.id());
            view.session = Some(handle.id().clone());
            view.dispatched.clear();
            self.reconciler.reset();
        }
        Some(handle)
    }
}
