//! Microphone / input mode controller
//!
//! `Idle -> Acquiring -> Enabled` on a successful toggle, straight back to
//! `Idle` on failure or on a toggle from `Enabled`. Toggles are rejected
//! while an acquisition is in flight.

use crate::engine::{Engine, SessionHandle, SessionId};
use crate::error::{Result, RouletteError};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MicrophonePhase {
    #[default]
    Idle,
    Acquiring,
    Enabled,
}

impl MicrophonePhase {
    pub fn is_enabled(&self) -> bool {
        matches!(self, MicrophonePhase::Enabled)
    }

    pub fn is_acquiring(&self) -> bool {
        matches!(self, MicrophonePhase::Acquiring)
    }

    pub fn state(&self) -> MicrophoneState {
        MicrophoneState {
            enabled: self.is_enabled(),
            acquiring: self.is_acquiring(),
        }
    }
}

impl std::fmt::Display for MicrophonePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MicrophonePhase::Idle => write!(f, "Idle"),
            MicrophonePhase::Acquiring => write!(f, "Acquiring"),
            MicrophonePhase::Enabled => write!(f, "Enabled"),
        }
    }
}

/// Flag view of the microphone
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MicrophoneState {
    pub enabled: bool,
    pub acquiring: bool,
}

/// Result of a toggle request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    Enabled,
    Disabled,
    /// An acquisition was already in flight
    Rejected,
}

#[derive(Debug, Default)]
struct Inner {
    phase: MicrophonePhase,
    /// Session the current acquisition or capture belongs to
    session: Option<SessionId>,
}

#[derive(Debug, Default)]
pub struct MicrophoneController {
    inner: Mutex<Inner>,
}

impl MicrophoneController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> MicrophonePhase {
        self.inner.lock().phase
    }

    pub fn state(&self) -> MicrophoneState {
        self.phase().state()
    }

    /// Toggle voice capture on `handle`'s session
    ///
    /// A failed acquisition returns `CapabilityError` and leaves the
    /// microphone off.
    pub async fn toggle<E: Engine + ?Sized>(
        &self,
        engine: &E,
        handle: &SessionHandle,
    ) -> Result<ToggleOutcome> {
        {
            let mut inner = self.inner.lock();
            let phase = inner.phase;
            match phase {
                MicrophonePhase::Acquiring => {
                    debug!("Microphone toggle rejected: acquisition in flight");
                    return Ok(ToggleOutcome::Rejected);
                }
                MicrophonePhase::Enabled => {
                    inner.phase = MicrophonePhase::Idle;
                    inner.session = None;
                    drop(inner);
                    if let Err(e) = engine.set_microphone_enabled(handle, false) {
                        warn!("Failed to clear microphone flag on {}: {}", handle.id(), e);
                    }
                    info!("Microphone disabled");
                    return Ok(ToggleOutcome::Disabled);
                }
                MicrophonePhase::Idle => {
                    inner.phase = MicrophonePhase::Acquiring;
                    inner.session = Some(handle.id().clone());
                }
            }
        }

        let acquired = match engine.start_audio(handle).await {
            Ok(()) => engine.set_microphone_enabled(handle, true),
            Err(e) => Err(e),
        };

        let mut inner = self.inner.lock();
        let still_ours = inner.phase.is_acquiring() && inner.session.as_ref() == Some(handle.id());

        match acquired {
            Ok(()) if still_ours => {
                inner.phase = MicrophonePhase::Enabled;
                info!("Microphone enabled on {}", handle.id());
                Ok(ToggleOutcome::Enabled)
            }
            Ok(()) => {
                // Acquisition was cancelled by a session change; its capture
                // belongs to a session that is going away.
                drop(inner);
                if let Err(e) = engine.set_microphone_enabled(handle, false) {
                    debug!("Stale microphone flag on {} not cleared: {}", handle.id(), e);
                }
                Err(RouletteError::CapabilityError(
                    "session changed during microphone acquisition".to_string(),
                ))
            }
            Err(e) => {
                if still_ours {
                    inner.phase = MicrophonePhase::Idle;
                    inner.session = None;
                }
                warn!("Microphone acquisition failed: {}", e);
                Err(RouletteError::CapabilityError(e.to_string()))
            }
        }
    }

    /// Turn capture off without an acquisition step
    ///
    /// Also cancels an in-flight acquisition. Best-effort: engine failures
    /// are logged. Returns whether anything was switched off.
    pub fn disable<E: Engine + ?Sized>(&self, engine: &E, handle: Option<&SessionHandle>) -> bool {
        let previous = {
            let mut inner = self.inner.lock();
            let previous = inner.phase;
            inner.phase = MicrophonePhase::Idle;
            inner.session = None;
            previous
        };

        match previous {
            MicrophonePhase::Idle => false,
            MicrophonePhase::Acquiring => {
                debug!("Cancelled in-flight microphone acquisition");
                true
            }
            MicrophonePhase::Enabled => {
                if let Some(handle) = handle {
                    if let Err(e) = engine.set_microphone_enabled(handle, false) {
                        warn!("Failed to disable microphone on {}: {}", handle.id(), e);
                    }
                }
                info!("Microphone disabled");
                true
            }
        }
    }
}
