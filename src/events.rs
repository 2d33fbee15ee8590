//! Events emitted to the presentation layer
//!
//! State should be queried from the orchestrator directly; events only say
//! that something happened.

use crate::engine::SessionId;
use crate::error::RouletteError;
use crate::microphone::MicrophonePhase;
use crate::navigation::RejectReason;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// A session is live for the persona at `index`
    SessionStarted {
        index: usize,
        persona_id: String,
        session_id: SessionId,
    },

    /// A navigation transition passed its guards
    TransitionStarted { from: usize, to: usize },

    /// The transition committed its new index
    TransitionCompleted { from: usize, to: usize },

    /// A request was turned away without touching state
    TransitionRejected { reason: RejectReason },

    /// The new session could not be acquired; `index` is unchanged
    TransitionFailed {
        index: usize,
        target: usize,
        error: RouletteError,
    },

    /// The microphone changed phase
    MicrophoneChanged(MicrophonePhase),

    /// An absorbed or surfaced error
    Error(RouletteError),

    /// The orchestrator released its session
    Shutdown,
}

/// Non-blocking sender side of the event channel
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: Sender<SessionEvent>,
}

impl EventSink {
    pub fn channel(capacity: usize) -> (Self, Receiver<SessionEvent>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }

    /// Emit without blocking the event timeline; a full channel drops the event
    pub fn emit(&self, event: SessionEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Event receiver dropped");
            }
        }
    }
}
