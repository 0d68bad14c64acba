// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ceremony lifecycle and its allowed transitions.

use std::fmt;

use super::CeremonyError;

/// Observable state of one keygen/reshare/keysign ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CeremonyState {
    DiscoveringSession,
    DiscoveringPeers,
    AwaitingCommitteeSelection,
    Running,
    AwaitingQuorum,
    Completed,
    TimedOut,
    Failed { reason: String },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Stage {
    DiscoveringSession,
    DiscoveringPeers,
    AwaitingCommitteeSelection,
    Running,
    AwaitingQuorum,
    Completed,
    TimedOut,
    Failed,
}

const VALID_TRANSITIONS: &[(Stage, Stage)] = &[
    (Stage::DiscoveringSession, Stage::DiscoveringPeers),
    (Stage::DiscoveringPeers, Stage::AwaitingCommitteeSelection),
    (Stage::AwaitingCommitteeSelection, Stage::Running),
    (Stage::Running, Stage::AwaitingQuorum),
    (Stage::AwaitingQuorum, Stage::Completed),
    (Stage::AwaitingQuorum, Stage::TimedOut),
    (Stage::DiscoveringSession, Stage::Failed),
    (Stage::DiscoveringPeers, Stage::Failed),
    (Stage::AwaitingCommitteeSelection, Stage::Failed),
    (Stage::Running, Stage::Failed),
    (Stage::AwaitingQuorum, Stage::Failed),
];

fn stage(state: &CeremonyState) -> Stage {
    match state {
        CeremonyState::DiscoveringSession => Stage::DiscoveringSession,
        CeremonyState::DiscoveringPeers => Stage::DiscoveringPeers,
        CeremonyState::AwaitingCommitteeSelection => Stage::AwaitingCommitteeSelection,
        CeremonyState::Running => Stage::Running,
        CeremonyState::AwaitingQuorum => Stage::AwaitingQuorum,
        CeremonyState::Completed => Stage::Completed,
        CeremonyState::TimedOut => Stage::TimedOut,
        CeremonyState::Failed { .. } => Stage::Failed,
    }
}

pub fn validate_transition(from: &CeremonyState, to: &CeremonyState) -> Result<(), CeremonyError> {
    if VALID_TRANSITIONS.contains(&(stage(from), stage(to))) {
        Ok(())
    } else {
        Err(CeremonyError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

pub fn is_terminal(state: &CeremonyState) -> bool {
    matches!(
        state,
        CeremonyState::Completed | CeremonyState::TimedOut | CeremonyState::Failed { .. }
    )
}

impl fmt::Display for CeremonyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiscoveringSession => f.write_str("discovering session"),
            Self::DiscoveringPeers => f.write_str("discovering peers"),
            Self::AwaitingCommitteeSelection => f.write_str("awaiting committee selection"),
            Self::Running => f.write_str("running"),
            Self::AwaitingQuorum => f.write_str("awaiting quorum"),
            Self::Completed => f.write_str("completed"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> CeremonyState {
        CeremonyState::Failed {
            reason: "engine".to_string(),
        }
    }

    #[test]
    fn happy_path_is_linear() {
        let path = [
            CeremonyState::DiscoveringSession,
            CeremonyState::DiscoveringPeers,
            CeremonyState::AwaitingCommitteeSelection,
            CeremonyState::Running,
            CeremonyState::AwaitingQuorum,
            CeremonyState::Completed,
        ];
        for pair in path.windows(2) {
            assert!(validate_transition(&pair[0], &pair[1]).is_ok(), "{} -> {}", pair[0], pair[1]);
        }
        assert!(validate_transition(&CeremonyState::Running, &CeremonyState::Completed).is_err());
    }

    #[test]
    fn timeout_only_from_awaiting_quorum() {
        assert!(validate_transition(&CeremonyState::AwaitingQuorum, &CeremonyState::TimedOut).is_ok());
        assert!(validate_transition(&CeremonyState::Running, &CeremonyState::TimedOut).is_err());
        assert!(validate_transition(&CeremonyState::DiscoveringPeers, &CeremonyState::TimedOut).is_err());
    }

    #[test]
    fn failure_from_any_live_state() {
        for state in [
            CeremonyState::DiscoveringSession,
            CeremonyState::DiscoveringPeers,
            CeremonyState::AwaitingCommitteeSelection,
            CeremonyState::Running,
            CeremonyState::AwaitingQuorum,
        ] {
            assert!(!is_terminal(&state));
            assert!(validate_transition(&state, &failed()).is_ok());
        }
    }

    #[test]
    fn terminal_states_are_final() {
        for state in [CeremonyState::Completed, CeremonyState::TimedOut, failed()] {
            assert!(is_terminal(&state));
            assert!(validate_transition(&state, &failed()).is_err());
            assert!(validate_transition(&state, &CeremonyState::Running).is_err());
        }
    }
}
