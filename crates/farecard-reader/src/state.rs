//! Card session state machine.
//!
//! # Valid Transitions
//!
//! - Idle → TechnologyDiscovered → MifareAttempt / DesfireAttempt / NdefAttempt
//! - DesfireAttempt → EmvAttempt (DESFire found nothing)
//! - Any attempt → a lower-priority attempt, when the protocol did not match
//! - Idle / TechnologyDiscovered / any attempt → HandleReleased → Done
//!
//! `HandleReleased` is reachable from every state before it, so a session
//! that fails at any point can still record its release.
//!
//! ```
//! use farecard_reader::state::{SessionMachine, SessionState};
//!
//! let mut machine = SessionMachine::new();
//! machine.transition_to(SessionState::TechnologyDiscovered).unwrap();
//! machine.transition_to(SessionState::DesfireAttempt).unwrap();
//! assert!(machine.transition_to(SessionState::MifareAttempt).is_err());
//! machine.transition_to(SessionState::EmvAttempt).unwrap();
//! machine.transition_to(SessionState::HandleReleased).unwrap();
//! machine.transition_to(SessionState::Done).unwrap();
//! assert!(machine.is_finished());
//! ```

use crate::drivers::Protocol;
use crate::error::{ReaderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// Transitions kept per session. A full session takes at most eight.
const MAX_HISTORY_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No technology claimed yet.
    Idle,

    /// Tag identified, technology set known.
    TechnologyDiscovered,

    MifareAttempt,

    /// ISO-DEP, first attempt.
    DesfireAttempt,

    /// ISO-DEP, second attempt.
    EmvAttempt,

    NdefAttempt,

    /// Technology released. Reached on every path.
    HandleReleased,

    Done,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SessionState::Idle => "Idle",
            SessionState::TechnologyDiscovered => "TechnologyDiscovered",
            SessionState::MifareAttempt => "MifareAttempt",
            SessionState::DesfireAttempt => "DesfireAttempt",
            SessionState::EmvAttempt => "EmvAttempt",
            SessionState::NdefAttempt => "NdefAttempt",
            SessionState::HandleReleased => "HandleReleased",
            SessionState::Done => "Done",
        };
        write!(f, "{}", state_str)
    }
}

impl SessionState {
    /// State entered while running `protocol`'s driver, if it has one.
    pub fn attempting(protocol: Protocol) -> Option<SessionState> {
        match protocol {
            Protocol::Mifare => Some(SessionState::MifareAttempt),
            Protocol::DesfireIsoDep => Some(SessionState::DesfireAttempt),
            Protocol::EmvIsoDep => Some(SessionState::EmvAttempt),
            Protocol::Ndef => Some(SessionState::NdefAttempt),
            Protocol::Unknown => None,
        }
    }

    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, target),
            // From Idle
            (Idle, TechnologyDiscovered)
                | (Idle, HandleReleased)
                // From TechnologyDiscovered
                | (TechnologyDiscovered, MifareAttempt)
                | (TechnologyDiscovered, DesfireAttempt)
                | (TechnologyDiscovered, NdefAttempt)
                | (TechnologyDiscovered, HandleReleased)
                // From MifareAttempt
                | (MifareAttempt, DesfireAttempt)
                | (MifareAttempt, NdefAttempt)
                | (MifareAttempt, HandleReleased)
                // From DesfireAttempt
                | (DesfireAttempt, EmvAttempt)
                | (DesfireAttempt, HandleReleased)
                // From EmvAttempt
                | (EmvAttempt, NdefAttempt)
                | (EmvAttempt, HandleReleased)
                // From NdefAttempt
                | (NdefAttempt, HandleReleased)
                // From HandleReleased
                | (HandleReleased, Done)
        )
    }

    pub fn is_attempt(&self) -> bool {
        matches!(
            self,
            SessionState::MifareAttempt
                | SessionState::DesfireAttempt
                | SessionState::EmvAttempt
                | SessionState::NdefAttempt
        )
    }
}

/// A single recorded transition.
///
/// `timestamp` is process-local and not serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: SessionState, to: SessionState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Validated state tracking for one session.
#[derive(Debug)]
pub struct SessionMachine {
    current_state: SessionState,
    history: VecDeque<StateTransition>,
    started_at: Instant,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            current_state: SessionState::Idle,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            started_at: Instant::now(),
        }
    }

    pub fn current_state(&self) -> &SessionState {
        &self.current_state
    }

    /// Transitions in order, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// States visited so far, starting with `Idle`.
    pub fn path(&self) -> Vec<SessionState> {
        std::iter::once(SessionState::Idle)
            .chain(self.history.iter().map(|transition| transition.to))
            .collect()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn is_finished(&self) -> bool {
        self.current_state == SessionState::Done
    }

    /// Move to `new_state` if the transition is valid.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::InvalidStateTransition`] and leaves the machine
    /// unchanged if the transition is not allowed.
    pub fn transition_to(&mut self, new_state: SessionState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(ReaderError::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.current_state = new_state;
        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(transition.clone());
        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use SessionState::*;

    #[test]
    fn test_initial_state() {
        let machine = SessionMachine::new();
        assert_eq!(machine.current_state(), &Idle);
        assert!(machine.history().is_empty());
        assert!(!machine.is_finished());
    }

    #[rstest]
    #[case(Idle, TechnologyDiscovered, true)]
    #[case(Idle, HandleReleased, true)]
    #[case(Idle, MifareAttempt, false)]
    #[case(Idle, Done, false)]
    #[case(TechnologyDiscovered, EmvAttempt, false)]
    #[case(TechnologyDiscovered, HandleReleased, true)]
    #[case(DesfireAttempt, EmvAttempt, true)]
    #[case(DesfireAttempt, NdefAttempt, false)]
    #[case(EmvAttempt, DesfireAttempt, false)]
    #[case(EmvAttempt, NdefAttempt, true)]
    #[case(NdefAttempt, MifareAttempt, false)]
    #[case(HandleReleased, Done, true)]
    #[case(HandleReleased, Idle, false)]
    #[case(Done, Idle, false)]
    fn test_transition_rules(
        #[case] from: SessionState,
        #[case] to: SessionState,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(&to), allowed);
    }

    #[test]
    fn test_every_state_before_release_can_release() {
        for state in [
            Idle,
            TechnologyDiscovered,
            MifareAttempt,
            DesfireAttempt,
            EmvAttempt,
            NdefAttempt,
        ] {
            assert!(state.can_transition_to(&HandleReleased), "{state}");
        }
    }

    #[test]
    fn test_invalid_transition_leaves_state() {
        let mut machine = SessionMachine::new();
        let error = machine.transition_to(Done).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Invalid session transition from Idle to Done"
        );
        assert_eq!(machine.current_state(), &Idle);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_path_records_fallthrough() {
        let mut machine = SessionMachine::new();
        for state in [TechnologyDiscovered, DesfireAttempt, EmvAttempt, HandleReleased, Done] {
            machine.transition_to(state).unwrap();
        }
        assert_eq!(
            machine.path(),
            vec![Idle, TechnologyDiscovered, DesfireAttempt, EmvAttempt, HandleReleased, Done]
        );
        let last = machine.history().back().unwrap();
        assert_eq!((last.from, last.to), (HandleReleased, Done));
    }

    #[test]
    fn test_attempt_states() {
        assert_eq!(SessionState::attempting(Protocol::EmvIsoDep), Some(EmvAttempt));
        assert_eq!(SessionState::attempting(Protocol::Unknown), None);
        assert!(NdefAttempt.is_attempt());
        assert!(!HandleReleased.is_attempt());
    }

    #[test]
    fn test_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TechnologyDiscovered).unwrap(),
            "\"technology_discovered\""
        );
    }
}
