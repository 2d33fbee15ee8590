//! Persona navigation
//!
//! The state machine owning the current persona index and the live session.

pub mod machine;

pub use machine::NavigationMachine;

use crate::engine::SessionId;

/// Direction of an `Advance` request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

impl Direction {
    pub fn offset(self) -> isize {
        match self {
            Direction::Next => 1,
            Direction::Previous => -1,
        }
    }
}

/// A request to change the active persona
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationRequest {
    Advance(Direction),
    JumpTo(usize),
}

/// Index reached by stepping `direction` from `current` in a cyclic catalog
pub fn step(current: usize, direction: Direction, len: usize) -> usize {
    debug_assert!(len > 0);
    (current as isize + direction.offset()).rem_euclid(len as isize) as usize
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NavigationPhase {
    /// No transition running
    #[default]
    Idle,
    /// Old session being released, new one being established
    Transitioning,
}

impl std::fmt::Display for NavigationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationPhase::Idle => write!(f, "Idle"),
            NavigationPhase::Transitioning => write!(f, "Transitioning"),
        }
    }
}

/// Snapshot of the navigation state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub current_index: usize,
    pub pending_transition: bool,
}

impl NavigationState {
    pub fn phase(&self) -> NavigationPhase {
        if self.pending_transition {
            NavigationPhase::Transitioning
        } else {
            NavigationPhase::Idle
        }
    }
}

/// Why a request was turned away as a no-op
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Another transition is in flight
    InFlight,
    /// The catalog has fewer than two personas
    NotNavigable,
    /// The requested persona already has a live session
    AlreadyActive,
    /// The machine has been shut down
    ShutDown,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::InFlight => write!(f, "a persona switch is already in progress"),
            RejectReason::NotNavigable => write!(f, "there is no other persona to switch to"),
            RejectReason::AlreadyActive => write!(f, "that persona is already active"),
            RejectReason::ShutDown => write!(f, "the session has ended"),
        }
    }
}

/// Result of a navigation request that did not fail
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    Completed {
        from: usize,
        to: usize,
        session: SessionId,
    },
    Rejected(RejectReason),
}

impl TransitionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransitionOutcome::Completed { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, TransitionOutcome::Rejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_wraps_both_ways() {
        assert_eq!(step(2, Direction::Next, 3), 0);
        assert_eq!(step(0, Direction::Previous, 3), 2);
        assert_eq!(step(1, Direction::Next, 3), 2);
        assert_eq!(step(1, Direction::Previous, 3), 0);
    }

    #[test]
    fn test_step_sequence_matches_modular_arithmetic() {
        let len = 5;
        let moves = [
            Direction::Next,
            Direction::Next,
            Direction::Previous,
            Direction::Previous,
            Direction::Previous,
            Direction::Next,
        ];

        let mut index = 0usize;
        let mut expected = 0isize;
        for direction in moves {
            index = step(index, direction, len);
            expected = (expected + direction.offset()).rem_euclid(len as isize);
            assert_eq!(index as isize, expected);
        }
    }

    #[test]
    fn test_state_phase() {
        let mut state = NavigationState::default();
        assert_eq!(state.phase(), NavigationPhase::Idle);

        state.pending_transition = true;
        assert_eq!(state.phase(), NavigationPhase::Transitioning);
    }
}
