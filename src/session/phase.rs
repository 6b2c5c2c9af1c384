//! The phase cycle and win-condition check.
//!
//! Phases advance through a fixed table; rounds 2..N loop from `DayResult`
//! back to `Night`. The terminal `End` phase is reached only through the
//! game-over check performed at every transition boundary, never through
//! the table itself.

use serde::{Deserialize, Serialize};

/// One named stage of the fixed per-round cycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Phase {
    /// Players gathering; no roles dealt yet.
    Lobby,
    /// Roles being dealt.
    AssignRoles,
    /// Night powers act.
    Night,
    /// Night outcome announced.
    Dawn,
    /// Open discussion.
    DayTalk,
    /// Votes cast.
    Vote,
    /// The accused speaks.
    Trial,
    /// Execution outcome announced; closes the round.
    DayResult,
    /// Terminal. The session is read-only from here on.
    End,
}

impl Phase {
    /// Next phase in the fixed table, or `None` from the terminal phase.
    ///
    /// `DayResult` loops back to `Night`; the caller increments the round.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Lobby => Some(Self::AssignRoles),
            Self::AssignRoles => Some(Self::Night),
            Self::Night => Some(Self::Dawn),
            Self::Dawn => Some(Self::DayTalk),
            Self::DayTalk => Some(Self::Vote),
            Self::Vote => Some(Self::Trial),
            Self::Trial => Some(Self::DayResult),
            Self::DayResult => Some(Self::Night),
            Self::End => None,
        }
    }

    /// Whether entering this phase clears pending votes.
    #[must_use]
    pub const fn clears_votes(self) -> bool {
        matches!(self, Self::Vote | Self::Trial)
    }

    /// Whether entering this phase clears pending night actions.
    #[must_use]
    pub const fn clears_night_actions(self) -> bool {
        matches!(self, Self::Night)
    }

    /// Whether this phase runs on a deadline at all. The lobby waits for the
    /// orchestrator, role assignment is instantaneous, and the terminal
    /// phase never moves again.
    #[must_use]
    pub const fn is_timed(self) -> bool {
        !matches!(self, Self::Lobby | Self::AssignRoles | Self::End)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Lobby => "Lobby",
            Self::AssignRoles => "AssignRoles",
            Self::Night => "Night",
            Self::Dawn => "Dawn",
            Self::DayTalk => "DayTalk",
            Self::Vote => "Vote",
            Self::Trial => "Trial",
            Self::DayResult => "DayResult",
            Self::End => "End",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_walks_the_full_cycle() {
        let mut phase = Phase::Lobby;
        let expected = [
            Phase::AssignRoles,
            Phase::Night,
            Phase::Dawn,
            Phase::DayTalk,
            Phase::Vote,
            Phase::Trial,
            Phase::DayResult,
            Phase::Night, // round + 1
        ];
        for want in expected {
            phase = phase.next().unwrap();
            assert_eq!(phase, want);
        }
    }

    #[test]
    fn end_is_terminal() {
        assert_eq!(Phase::End.next(), None);
    }

    #[test]
    fn pending_data_reset_rules() {
        assert!(Phase::Vote.clears_votes());
        assert!(Phase::Trial.clears_votes());
        assert!(!Phase::Night.clears_votes());
        assert!(Phase::Night.clears_night_actions());
        assert!(!Phase::Dawn.clears_night_actions());
    }

    #[test]
    fn transitional_phases_are_untimed() {
        assert!(!Phase::Lobby.is_timed());
        assert!(!Phase::AssignRoles.is_timed());
        assert!(!Phase::End.is_timed());
        assert!(Phase::Vote.is_timed());
        assert!(Phase::Night.is_timed());
    }
}
