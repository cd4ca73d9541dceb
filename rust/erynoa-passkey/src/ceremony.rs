use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PasskeyErrorCode;

/// Where a ceremony is in its lifecycle.
///
/// ```text
/// Idle -> ChallengeAcquired -> InProgress -> Success
///    \            \                 \------> Failed | Cancelled | TimedOut
///     \            \--------------------------^
///      \--------------------------------------^
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeremonyState {
    /// Not started.
    Idle,
    /// A challenge has been obtained.
    ChallengeAcquired,
    /// Waiting on the authenticator.
    InProgress,
    /// Completed.
    Success,
    /// Ended with an error.
    Failed,
    /// The user cancelled.
    Cancelled,
    /// The authenticator did not answer in time.
    TimedOut,
}

impl CeremonyState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CeremonyState::Success
                | CeremonyState::Failed
                | CeremonyState::Cancelled
                | CeremonyState::TimedOut
        )
    }

    /// Whether `self -> next` is a legal step.
    pub fn can_transition_to(self, next: CeremonyState) -> bool {
        use CeremonyState::*;
        match (self, next) {
            (Idle, ChallengeAcquired) | (ChallengeAcquired, InProgress) | (InProgress, Success) => {
                true
            }
            (from, Failed | Cancelled | TimedOut) => !from.is_terminal(),
            _ => false,
        }
    }

    /// The terminal state a failure with `code` ends in.
    pub fn terminal_for(code: PasskeyErrorCode) -> Self {
        match code {
            PasskeyErrorCode::UserCancelled => CeremonyState::Cancelled,
            PasskeyErrorCode::Timeout => CeremonyState::TimedOut,
            _ => CeremonyState::Failed,
        }
    }
}

/// Which ceremony is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeremonyKind {
    /// Create a credential and derive its DID.
    Registration,
    /// Assert a stored credential and make its DID active.
    Authentication,
    /// Sign a message with a stored credential.
    Signing,
}

impl std::fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CeremonyKind::Registration => "registration",
            CeremonyKind::Authentication => "authentication",
            CeremonyKind::Signing => "signing",
        })
    }
}

/// An attempted transition the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal ceremony transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    /// The state before the transition.
    pub from: CeremonyState,
    /// The rejected target state.
    pub to: CeremonyState,
}

/// Tracks one run of a ceremony through [`CeremonyState`].
#[derive(Debug, Clone)]
pub struct Ceremony {
    kind: CeremonyKind,
    state: CeremonyState,
    started_at: DateTime<Utc>,
}

impl Ceremony {
    /// A ceremony in [`CeremonyState::Idle`].
    pub fn new(kind: CeremonyKind) -> Self {
        Self {
            kind,
            state: CeremonyState::Idle,
            started_at: erynoa_common::now(),
        }
    }

    /// Which ceremony this is.
    pub fn kind(&self) -> CeremonyKind {
        self.kind
    }

    /// The current state.
    pub fn state(&self) -> CeremonyState {
        self.state
    }

    /// When the ceremony was created.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Move to `next` if the transition is legal.
    pub fn advance(&mut self, next: CeremonyState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// End the ceremony with a failure. A ceremony that already ended keeps
    /// its state.
    pub fn fail(&mut self, code: PasskeyErrorCode) -> CeremonyState {
        if !self.state.is_terminal() {
            self.state = CeremonyState::terminal_for(code);
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_walks_the_happy_path() {
        let mut ceremony = Ceremony::new(CeremonyKind::Registration);
        ceremony.advance(CeremonyState::ChallengeAcquired).unwrap();
        ceremony.advance(CeremonyState::InProgress).unwrap();
        ceremony.advance(CeremonyState::Success).unwrap();
        assert!(ceremony.state().is_terminal());
    }

    #[test]
    fn it_rejects_skipping_steps() {
        let mut ceremony = Ceremony::new(CeremonyKind::Signing);
        assert_eq!(
            ceremony.advance(CeremonyState::InProgress),
            Err(InvalidTransition {
                from: CeremonyState::Idle,
                to: CeremonyState::InProgress
            })
        );
    }

    #[test]
    fn it_picks_the_terminal_state_from_the_failure_code() {
        for (code, state) in [
            (PasskeyErrorCode::UserCancelled, CeremonyState::Cancelled),
            (PasskeyErrorCode::Timeout, CeremonyState::TimedOut),
            (PasskeyErrorCode::StorageError, CeremonyState::Failed),
        ] {
            let mut ceremony = Ceremony::new(CeremonyKind::Authentication);
            ceremony.advance(CeremonyState::ChallengeAcquired).unwrap();
            assert_eq!(ceremony.fail(code), state);
        }
    }

    #[test]
    fn it_never_leaves_a_terminal_state() {
        let mut ceremony = Ceremony::new(CeremonyKind::Authentication);
        ceremony.fail(PasskeyErrorCode::Timeout);
        assert_eq!(
            ceremony.fail(PasskeyErrorCode::UserCancelled),
            CeremonyState::TimedOut
        );
        assert!(ceremony.advance(CeremonyState::ChallengeAcquired).is_err());
    }
}
