//! Roles, alignments, and night-action kinds.
//!
//! The role set is a closed enum: per-role powers and constraints are matched
//! exhaustively, so adding a role is a compile-time-enforced change rather
//! than a runtime lookup with a silent default.

use serde::{Deserialize, Serialize};

/// Coarse team grouping derived from role, used for win-condition checks and
/// chat-visibility scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alignment {
    /// The cooperative majority.
    Village,
    /// The hidden antagonist minority.
    Werewolf,
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Village => write!(f, "Village"),
            Self::Werewolf => write!(f, "Werewolf"),
        }
    }
}

/// The fixed role set. Immutable once assigned to a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Antagonist; eliminates one seat each night.
    Werewolf,
    /// Inspects one seat's alignment each night.
    Seer,
    /// Holds one cure and one harm charge for the whole game.
    Witch,
    /// Protects one seat each night, never the same seat twice in a row.
    Guard,
    /// No night power.
    Hunter,
    /// No night power.
    Idiot,
    /// No night power.
    Villager,
}

impl Role {
    /// The alignment this role plays for.
    #[must_use]
    pub const fn alignment(self) -> Alignment {
        match self {
            Self::Werewolf => Alignment::Werewolf,
            Self::Seer | Self::Witch | Self::Guard | Self::Hunter | Self::Idiot | Self::Villager => {
                Alignment::Village
            }
        }
    }

    /// Night-action kinds this role can ever perform, before resource and
    /// phase checks.
    #[must_use]
    pub const fn night_actions(self) -> &'static [NightActionKind] {
        match self {
            Self::Werewolf => &[NightActionKind::Eliminate],
            Self::Seer => &[NightActionKind::Inspect],
            Self::Witch => &[NightActionKind::Cure, NightActionKind::Harm],
            Self::Guard => &[NightActionKind::Protect],
            Self::Hunter | Self::Idiot | Self::Villager => &[],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Werewolf => "Werewolf",
            Self::Seer => "Seer",
            Self::Witch => "Witch",
            Self::Guard => "Guard",
            Self::Hunter => "Hunter",
            Self::Idiot => "Idiot",
            Self::Villager => "Villager",
        };
        write!(f, "{name}")
    }
}

/// The five night-action categories, listed in resolution precedence order.
///
/// Resolution applies categories in this fixed order — never submission
/// order — because later categories must see the effect of earlier ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NightActionKind {
    /// Shields a seat from elimination this night.
    Protect,
    /// Marks a seat to die unless protected.
    Eliminate,
    /// Removes a seat from the to-die set (single-use).
    Cure,
    /// Adds a seat to the to-die set (single-use, separate charge).
    Harm,
    /// Reads the target's alignment; never affects life or death.
    Inspect,
}

impl std::fmt::Display for NightActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Protect => "protect",
            Self::Eliminate => "eliminate",
            Self::Cure => "cure",
            Self::Harm => "harm",
            Self::Inspect => "inspect",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_werewolf_is_antagonist() {
        let roles = [
            Role::Werewolf,
            Role::Seer,
            Role::Witch,
            Role::Guard,
            Role::Hunter,
            Role::Idiot,
            Role::Villager,
        ];
        for role in roles {
            let expected = role == Role::Werewolf;
            assert_eq!(role.alignment() == Alignment::Werewolf, expected, "{role}");
        }
    }

    #[test]
    fn witch_has_two_distinct_charges() {
        let actions = Role::Witch.night_actions();
        assert_eq!(actions.len(), 2);
        assert!(actions.contains(&NightActionKind::Cure));
        assert!(actions.contains(&NightActionKind::Harm));
    }

    #[test]
    fn passive_roles_have_no_night_actions() {
        assert!(Role::Hunter.night_actions().is_empty());
        assert!(Role::Idiot.night_actions().is_empty());
        assert!(Role::Villager.night_actions().is_empty());
    }

    #[test]
    fn kind_ordering_matches_resolution_precedence() {
        let mut kinds = vec![
            NightActionKind::Inspect,
            NightActionKind::Harm,
            NightActionKind::Protect,
            NightActionKind::Cure,
            NightActionKind::Eliminate,
        ];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                NightActionKind::Protect,
                NightActionKind::Eliminate,
                NightActionKind::Cure,
                NightActionKind::Harm,
                NightActionKind::Inspect,
            ]
        );
    }
}
